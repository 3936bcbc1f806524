//! Cooperative cancellation for credential flows
//!
//! An [`AbortSignal`] is shared between whoever may cancel an operation (the
//! caller, or the flow's own timeout timer) and the code doing the work. Work
//! checks the signal before irreversible steps and races every suspension
//! point against it with [`AbortSignal::guard`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Why a signal fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// The caller cancelled the operation
    Cancelled,
    /// The operation's timeout elapsed
    Timeout,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

/// Cloneable cancellation handle carrying the first abort reason
#[derive(Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<AbortReason>>,
    parent: Option<Arc<AbortSignal>>,
}

impl AbortSignal {
    /// Create a signal that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire with [`AbortReason::Cancelled`]
    pub fn abort(&self) {
        self.abort_with(AbortReason::Cancelled);
    }

    /// Fire with an explicit reason
    ///
    /// Only the first reason is kept; later calls are no-ops. If an ancestor
    /// has already fired, its reason is kept instead.
    pub fn abort_with(&self, reason: AbortReason) {
        let reason = self
            .parent
            .as_ref()
            .and_then(|parent| parent.reason())
            .unwrap_or(reason);
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Whether the signal (or any ancestor) has fired
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The reason the signal fired, if it has
    pub fn reason(&self) -> Option<AbortReason> {
        if !self.is_aborted() {
            return None;
        }
        self.reason
            .get()
            .copied()
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.reason()))
            .or(Some(AbortReason::Cancelled))
    }

    /// Fail with the abort reason if the signal has fired
    pub fn check(&self) -> Result<(), AbortReason> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Derive a signal that fires when this one does, or on its own
    ///
    /// Aborting the child does not affect the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::default(),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Wait until the signal fires
    pub async fn aborted(&self) -> AbortReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(AbortReason::Cancelled)
    }

    /// Run `future` to completion unless the signal fires first
    ///
    /// An already-fired signal wins even if `future` is immediately ready.
    pub async fn guard<F>(&self, future: F) -> Result<F::Output, AbortReason>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            reason = self.aborted() => Err(reason),
            output = future => Ok(output),
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("reason", &self.reason())
            .finish()
    }
}
