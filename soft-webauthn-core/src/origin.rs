//! RP ID and origin handling
//!
//! RP IDs and origins arrive either as full origins (`https://example.com`)
//! or as bare hostnames (`example.com`). Bare hostnames are read as https.

use crate::auth_data::HASH_LEN;
use crate::error::{Error, Result};

use sha2::{Digest, Sha256};
use url::Url;

fn parse(value: &str) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) if url.host_str().is_some() => Some(url),
        _ => Url::parse(&format!("https://{value}"))
            .ok()
            .filter(|url| url.host_str().is_some()),
    }
}

fn is_localhost(host: &str) -> bool {
    host == "localhost" || host.ends_with(".localhost")
}

/// Hostname of an RP ID
pub fn rp_id_hostname(rp_id: &str) -> Result<String> {
    parse(rp_id)
        .and_then(|url| url.host_str().map(str::to_owned))
        .ok_or_else(|| Error::InvalidRpId(rp_id.to_string()))
}

/// rpIdHash: SHA-256 of the RP ID's hostname
pub fn rp_id_hash(rp_id: &str) -> Result<[u8; HASH_LEN]> {
    let hostname = rp_id_hostname(rp_id)?;
    Ok(Sha256::digest(hostname.as_bytes()).into())
}

/// Whether `host` is `origin` or a subdomain of it
///
/// Both sides must be https, except that two localhost origins always match
/// regardless of scheme and port. Subdomains match on label boundaries, so
/// `https://evilexample.com` is not a subdomain of `https://example.com`.
///
/// # Examples
///
/// ```
/// use soft_webauthn_core::origin::is_registrable_domain;
///
/// assert!(is_registrable_domain("https://login.example.com", "https://example.com"));
/// assert!(!is_registrable_domain("http://example.com", "https://example.com"));
/// assert!(is_registrable_domain("http://localhost:8080", "http://localhost:3000"));
/// ```
pub fn is_registrable_domain(host: &str, origin: &str) -> bool {
    let (Some(host), Some(origin)) = (parse(host), parse(origin)) else {
        return false;
    };
    let (Some(host_name), Some(origin_name)) = (host.host_str(), origin.host_str()) else {
        return false;
    };

    if is_localhost(host_name) && is_localhost(origin_name) {
        return true;
    }
    if host.scheme() != "https" || origin.scheme() != "https" {
        return false;
    }

    host_name == origin_name
        || host_name
            .strip_suffix(origin_name)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
