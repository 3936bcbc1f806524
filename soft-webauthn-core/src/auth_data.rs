//! authenticatorData (WebAuthn section 6.1) construction and parsing
//!
//! Layout:
//!
//! ```text
//! rpIdHash (32) | flags (1) | signCount (4, BE)
//!   [ aaguid (16) | credentialIdLength (2, BE) | credentialId | credentialPublicKey ]
//! ```
//!
//! The bracketed attested credential data is present when the AT flag is set.

use crate::error::{Error, Result};

use std::fmt;

/// Length of rpIdHash and clientDataHash
pub const HASH_LEN: usize = 32;

/// Length of the fixed header (rpIdHash, flags, signCount)
pub const HEADER_LEN: usize = HASH_LEN + 1 + 4;

/// Length of the AAGUID
pub const AAGUID_LEN: usize = 16;

/// This authenticator does not attest to a model, so its AAGUID is all zeros
pub const ZERO_AAGUID: [u8; AAGUID_LEN] = [0; AAGUID_LEN];

/// authenticatorData flag bits
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u8);

impl Flags {
    /// User present
    pub const UP: Flags = Flags(0x01);
    /// User verified
    pub const UV: Flags = Flags(0x04);
    /// Backup eligible
    pub const BE: Flags = Flags(0x08);
    /// Backup state
    pub const BS: Flags = Flags(0x10);
    /// Attested credential data included
    pub const AT: Flags = Flags(0x40);
    /// Extension data included
    pub const ED: Flags = Flags(0x80);

    /// Flags for a registration response
    pub const CREATE: Flags = Flags(Self::UP.0 | Self::UV.0 | Self::AT.0);
    /// Flags for an assertion response
    pub const ASSERT: Flags = Flags(Self::UP.0 | Self::UV.0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Flags) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        self.with(rhs)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::UP, "UP"),
            (Self::UV, "UV"),
            (Self::BE, "BE"),
            (Self::BS, "BS"),
            (Self::AT, "AT"),
            (Self::ED, "ED"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Flags({:#04x}: {})", self.0, set.join("|"))
    }
}

/// Attested credential data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// Encoded COSE_Key
    pub credential_public_key: Vec<u8>,
}

/// Decoded authenticatorData
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; HASH_LEN],
    pub flags: Flags,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Serialize to the wire layout
    ///
    /// The AT flag is derived from the presence of attested credential data.
    /// Attested credential data is only produced after user verification, so
    /// UV is set alongside AT.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut flags = Flags(self.flags.0 & !Flags::AT.0);
        if self.attested_credential.is_some() {
            flags = flags.with(Flags::AT).with(Flags::UV);
        }

        let mut auth_data = Vec::with_capacity(HEADER_LEN);
        auth_data.extend_from_slice(&self.rp_id_hash);
        auth_data.push(flags.bits());
        auth_data.extend_from_slice(&self.sign_count.to_be_bytes());

        if let Some(attested) = &self.attested_credential {
            let id_len = u16::try_from(attested.credential_id.len())
                .map_err(|_| Error::CredentialIdTooLong(attested.credential_id.len()))?;

            auth_data.extend_from_slice(&attested.aaguid);
            auth_data.extend_from_slice(&id_len.to_be_bytes());
            auth_data.extend_from_slice(&attested.credential_id);
            auth_data.extend_from_slice(&attested.credential_public_key);
        }

        Ok(auth_data)
    }

    /// Parse the wire layout
    ///
    /// Extension data is not produced by this authenticator; when the ED flag
    /// is set the trailing bytes are kept as part of the credential key.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedAuthenticatorData("shorter than 37 bytes"));
        }

        let (rp_id_hash, rest) = bytes.split_at(HASH_LEN);
        let flags = Flags(rest[0]);
        let sign_count = u32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]]);
        let rest = &rest[5..];

        let attested_credential = if flags.contains(Flags::AT) {
            if rest.len() < AAGUID_LEN + 2 {
                return Err(Error::MalformedAuthenticatorData(
                    "truncated attested credential data",
                ));
            }
            let (aaguid, rest) = rest.split_at(AAGUID_LEN);
            let id_len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            let rest = &rest[2..];
            if rest.len() < id_len {
                return Err(Error::MalformedAuthenticatorData("truncated credential ID"));
            }
            let (credential_id, credential_public_key) = rest.split_at(id_len);
            if credential_public_key.is_empty() {
                return Err(Error::MalformedAuthenticatorData(
                    "missing credential public key",
                ));
            }

            let mut aaguid_bytes = [0u8; AAGUID_LEN];
            aaguid_bytes.copy_from_slice(aaguid);
            Some(AttestedCredentialData {
                aaguid: aaguid_bytes,
                credential_id: credential_id.to_vec(),
                credential_public_key: credential_public_key.to_vec(),
            })
        } else {
            if !rest.is_empty() {
                return Err(Error::MalformedAuthenticatorData(
                    "trailing bytes without AT flag",
                ));
            }
            None
        };

        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(rp_id_hash);
        Ok(Self {
            rp_id_hash: hash,
            flags,
            sign_count,
            attested_credential,
        })
    }
}

/// Build authenticatorData for a registration response
///
/// `rp_id_hash` must be a SHA-256 digest. The credential ID is limited to
/// 65535 bytes by its length prefix; longer IDs fail before anything is signed.
pub fn build_authenticator_data(
    rp_id_hash: &[u8],
    flags: Flags,
    sign_count: u32,
    credential_id: &[u8],
    credential_public_key: &[u8],
) -> Result<Vec<u8>> {
    AuthenticatorData {
        rp_id_hash: hash_array(rp_id_hash)?,
        flags,
        sign_count,
        attested_credential: Some(AttestedCredentialData {
            aaguid: ZERO_AAGUID,
            credential_id: credential_id.to_vec(),
            credential_public_key: credential_public_key.to_vec(),
        }),
    }
    .to_bytes()
}

/// Build authenticatorData for an assertion response
pub fn build_assertion_data(rp_id_hash: &[u8], flags: Flags, sign_count: u32) -> Result<Vec<u8>> {
    AuthenticatorData {
        rp_id_hash: hash_array(rp_id_hash)?,
        flags,
        sign_count,
        attested_credential: None,
    }
    .to_bytes()
}

fn hash_array(hash: &[u8]) -> Result<[u8; HASH_LEN]> {
    hash.try_into()
        .map_err(|_| Error::InvalidHashLength(hash.len()))
}
