//! Authenticator configuration

use std::time::Duration;

use serde::Deserialize;
use soft_webauthn_core::CoseAlgorithm;
use soft_webauthn_core::attestation::SUPPORTED_ALGORITHMS;

/// Timeout applied when the normalized options carry none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for any ceremony timeout
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Lower bound for any ceremony timeout
pub const MIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Authenticator configuration
///
/// Deserializes from millisecond fields so it can be embedded in TOML or
/// JSON settings files:
///
/// ```
/// use soft_webauthn::AuthenticatorConfig;
///
/// let config: AuthenticatorConfig =
///     serde_json::from_str(r#"{"default_timeout_ms": 60000}"#).unwrap();
/// assert_eq!(config.default_timeout().as_secs(), 60);
/// assert_eq!(config.algorithms, vec![-7]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    pub default_timeout_ms: u64,
    pub max_timeout_ms: u64,
    pub min_timeout_ms: u64,
    /// COSE algorithms this authenticator offers, in preference order
    pub algorithms: Vec<i32>,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_timeout_ms: MAX_TIMEOUT.as_millis() as u64,
            min_timeout_ms: MIN_TIMEOUT.as_millis() as u64,
            algorithms: vec![CoseAlgorithm::ES256.to_i32()],
        }
    }
}

impl AuthenticatorConfig {
    pub fn builder() -> AuthenticatorConfigBuilder {
        AuthenticatorConfigBuilder::default()
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    pub fn min_timeout(&self) -> Duration {
        Duration::from_millis(self.min_timeout_ms)
    }

    /// Timeout for one ceremony
    ///
    /// The requested timeout (or the default) is clamped into
    /// `[min_timeout, max_timeout]`. A max below the min is raised to it.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        let min = self.min_timeout();
        let max = self.max_timeout().max(min);
        requested
            .unwrap_or_else(|| self.default_timeout())
            .clamp(min, max)
    }

    /// Algorithms the authenticator will sign with
    ///
    /// Configured algorithms the signer cannot produce are dropped.
    pub fn supported_algorithms(&self) -> Vec<CoseAlgorithm> {
        self.algorithms
            .iter()
            .filter_map(|alg| CoseAlgorithm::from_i32(*alg))
            .filter(|alg| SUPPORTED_ALGORITHMS.contains(alg))
            .collect()
    }
}

/// Builder for AuthenticatorConfig
#[derive(Debug, Default)]
pub struct AuthenticatorConfigBuilder {
    default_timeout: Option<Duration>,
    max_timeout: Option<Duration>,
    min_timeout: Option<Duration>,
    algorithms: Vec<i32>,
}

impl AuthenticatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn max_timeout(mut self, timeout: Duration) -> Self {
        self.max_timeout = Some(timeout);
        self
    }

    pub fn min_timeout(mut self, timeout: Duration) -> Self {
        self.min_timeout = Some(timeout);
        self
    }

    pub fn algorithms(mut self, algorithms: Vec<i32>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn build(self) -> AuthenticatorConfig {
        let defaults = AuthenticatorConfig::default();
        let millis = |timeout: Option<Duration>, fallback: u64| {
            timeout.map_or(fallback, |timeout| timeout.as_millis() as u64)
        };

        AuthenticatorConfig {
            default_timeout_ms: millis(self.default_timeout, defaults.default_timeout_ms),
            max_timeout_ms: millis(self.max_timeout, defaults.max_timeout_ms),
            min_timeout_ms: millis(self.min_timeout, defaults.min_timeout_ms),
            algorithms: if self.algorithms.is_empty() {
                defaults.algorithms
            } else {
                self.algorithms
            },
        }
    }
}
