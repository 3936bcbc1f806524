//! COSE_Key (RFC 8152 section 7) conversion from JSON Web Keys
//!
//! JWK member names map to integer labels and registry strings map to
//! integer values; coordinates and scalars become byte strings. The
//! conversion is driven by the member list, so a key with members
//! unknown to COSE is rejected rather than silently truncated.

use crate::cbor::{self, MapBuilder, Value};
use crate::error::{Error, Result};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use soft_webauthn_crypto::{JsonWebKey, PublicKey};

/// COSE key common parameter and EC2 labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoseLabel {
    Kty,
    Alg,
    KeyOps,
    Crv,
    X,
    Y,
    D,
}

impl CoseLabel {
    /// Label for a JWK member name
    pub fn from_member(name: &str) -> Option<Self> {
        match name {
            "kty" => Some(Self::Kty),
            "alg" => Some(Self::Alg),
            "key_ops" => Some(Self::KeyOps),
            "crv" => Some(Self::Crv),
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "d" => Some(Self::D),
            _ => None,
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::Kty => 1,
            Self::Alg => 3,
            Self::KeyOps => 4,
            Self::Crv => -1,
            Self::X => -2,
            Self::Y => -3,
            Self::D => -4,
        }
    }

    fn member(self) -> &'static str {
        match self {
            Self::Kty => "kty",
            Self::Alg => "alg",
            Self::KeyOps => "key_ops",
            Self::Crv => "crv",
            Self::X => "x",
            Self::Y => "y",
            Self::D => "d",
        }
    }
}

/// COSE key type values
pub fn key_type(name: &str) -> Option<i32> {
    match name {
        "OKP" => Some(1),
        "EC" | "EC2" => Some(2),
        "RSA" => Some(3),
        "oct" | "Symmetric" => Some(4),
        _ => None,
    }
}

/// COSE elliptic curve values
pub fn curve(name: &str) -> Option<i32> {
    match name {
        "P-256" => Some(1),
        "P-384" => Some(2),
        "P-521" => Some(3),
        _ => None,
    }
}

/// COSE algorithm values
pub fn algorithm(name: &str) -> Option<i32> {
    match name {
        "ES256" => Some(-7),
        "ES384" => Some(-35),
        "ES512" => Some(-36),
        _ => None,
    }
}

/// A JWK member value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwkMember<'a> {
    Text(&'a str),
    List(&'a [String]),
}

/// Members of a JWK in COSE label order
///
/// Absent optional members are skipped. `d` is included when present.
pub fn members(jwk: &JsonWebKey) -> Vec<(&str, JwkMember<'_>)> {
    let mut members = vec![("kty", JwkMember::Text(&jwk.kty))];
    if let Some(alg) = &jwk.alg {
        members.push(("alg", JwkMember::Text(alg)));
    }
    if let Some(key_ops) = &jwk.key_ops {
        members.push(("key_ops", JwkMember::List(key_ops)));
    }
    members.push(("crv", JwkMember::Text(&jwk.crv)));
    members.push(("x", JwkMember::Text(&jwk.x)));
    members.push(("y", JwkMember::Text(&jwk.y)));
    if let Some(d) = &jwk.d {
        members.push(("d", JwkMember::Text(d)));
    }
    members
}

/// Convert JWK members to a COSE_Key map, preserving member order
///
/// # Examples
///
/// ```
/// use soft_webauthn_core::{cbor, cose::{self, JwkMember}};
///
/// let empty = cose::to_cose_key(Vec::<(&str, JwkMember)>::new()).unwrap();
/// assert_eq!(cbor::encode(&empty).unwrap(), [0xa0]);
///
/// let x_only = cose::to_cose_key([("x", JwkMember::Text(""))]).unwrap();
/// assert_eq!(cbor::encode(&x_only).unwrap(), [0xa1, 0x21, 0x40]);
/// ```
pub fn to_cose_key<'a, I>(members: I) -> Result<Value>
where
    I: IntoIterator<Item = (&'a str, JwkMember<'a>)>,
{
    let mut map = MapBuilder::new();

    for (name, member) in members {
        let label =
            CoseLabel::from_member(name).ok_or_else(|| Error::UnsupportedKeyField(name.into()))?;
        let value = member_value(label, member)?;
        map = map.insert(label.to_i32(), value);
    }

    Ok(map.build())
}

/// COSE_Key for the public half of a JWK
///
/// `d` and `key_ops` are never emitted, so the result has kty, alg (when
/// present), crv, x, y in that order.
pub fn public_key_from_jwk(jwk: &JsonWebKey) -> Result<Value> {
    to_cose_key(members(&jwk.to_public()))
}

/// Encoded COSE_Key for a credential public key
pub fn encode_public_key(public_key: &PublicKey) -> Result<Vec<u8>> {
    cbor::encode(&public_key_from_jwk(&public_key.to_jwk())?)
}

/// Recover an ES256 public key from an encoded COSE_Key
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey> {
    use cbor4ii::core::Value as Decoded;

    let decoded: Decoded = cbor4ii::serde::from_slice(bytes)
        .map_err(|_| Error::MalformedAttestation("credential public key is not CBOR"))?;
    let Decoded::Map(entries) = decoded else {
        return Err(Error::MalformedAttestation(
            "credential public key is not a map",
        ));
    };

    let lookup = |label: i32| {
        entries.iter().find_map(|(key, value)| match key {
            Decoded::Integer(k) if *k == i128::from(label) => Some(value),
            _ => None,
        })
    };
    let integer = |label: CoseLabel| match lookup(label.to_i32()) {
        Some(Decoded::Integer(value)) => Some(*value),
        _ => None,
    };
    let byte_string = |label: CoseLabel| match lookup(label.to_i32()) {
        Some(Decoded::Bytes(value)) => Some(value.as_slice()),
        _ => None,
    };

    if integer(CoseLabel::Kty) != Some(2) {
        return Err(Error::MalformedAttestation("credential key is not EC2"));
    }
    if integer(CoseLabel::Crv) != Some(1) {
        return Err(Error::MalformedAttestation("credential key is not P-256"));
    }
    let x = byte_string(CoseLabel::X).ok_or(Error::MalformedAttestation("missing x coordinate"))?;
    let y = byte_string(CoseLabel::Y).ok_or(Error::MalformedAttestation("missing y coordinate"))?;

    Ok(PublicKey::from_coordinates(x, y)?)
}

fn member_value(label: CoseLabel, member: JwkMember<'_>) -> Result<Value> {
    let unsupported = |value: String| Error::UnsupportedKeyValue {
        field: label.member(),
        value,
    };

    match (label, member) {
        (CoseLabel::Kty, JwkMember::Text(name)) => key_type(name)
            .map(Value::from)
            .ok_or_else(|| unsupported(name.into())),
        (CoseLabel::Alg, JwkMember::Text(name)) => algorithm(name)
            .map(Value::from)
            .ok_or_else(|| unsupported(name.into())),
        (CoseLabel::Crv, JwkMember::Text(name)) => curve(name)
            .map(Value::from)
            .ok_or_else(|| unsupported(name.into())),
        (CoseLabel::X | CoseLabel::Y | CoseLabel::D, JwkMember::Text(encoded)) => URL_SAFE_NO_PAD
            .decode(encoded)
            .map(Value::Bytes)
            .map_err(|_| Error::InvalidEncoding {
                field: label.member(),
            }),
        (CoseLabel::KeyOps, JwkMember::List(ops)) => Ok(Value::Array(
            ops.iter().map(|op| Value::from(op.as_str())).collect(),
        )),
        (_, JwkMember::List(ops)) => Err(unsupported(ops.join(","))),
        (CoseLabel::KeyOps, JwkMember::Text(op)) => Err(unsupported(op.into())),
    }
}
