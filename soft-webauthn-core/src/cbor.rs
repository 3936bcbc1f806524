//! CBOR (RFC 8949) encoder for attestation objects and COSE keys
//!
//! Encoding is deterministic: every head uses the shortest argument form and
//! map entries are written in insertion order, so callers control key order.
//! Tags, indefinite lengths and floating point output are never produced.
//!
//! # Usage
//!
//! ```
//! use soft_webauthn_core::cbor::{self, MapBuilder};
//!
//! let value = MapBuilder::new()
//!     .insert("fmt", "packed")
//!     .insert("alg", -7)
//!     .build();
//!
//! let bytes = cbor::encode(&value).unwrap();
//! assert_eq!(bytes[0], 0xa2);
//! ```

use crate::error::{Error, Result};

/// Major types (RFC 8949 section 3.1)
mod major {
    pub const UNSIGNED: u8 = 0;
    pub const NEGATIVE: u8 = 1;
    pub const BYTES: u8 = 2;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
}

/// Simple values (major type 7)
mod simple {
    pub const FALSE: u8 = 0xf4;
    pub const TRUE: u8 = 0xf5;
    pub const NULL: u8 = 0xf6;
    pub const UNDEFINED: u8 = 0xf7;
}

/// Largest magnitude representable by major types 0 and 1
const MAX_ARGUMENT: i128 = u64::MAX as i128;

/// 2^64 as a float, the first integral value outside major type 0
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// A value the encoder accepts
///
/// `Float` exists so numbers arriving from loosely typed sources can be
/// encoded when they are integral; non-integral floats are rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Byte string from hex text
    ///
    /// Hex-tagged text is how byte strings are written in test vectors and
    /// configuration, so it has a dedicated constructor.
    pub fn bytes_from_hex(hex_text: &str) -> Result<Self> {
        hex::decode(hex_text)
            .map(Value::Bytes)
            .map_err(|_| Error::InvalidEncoding { field: "hex" })
    }

    /// Entries of a map value
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

/// Builder for CBOR maps that keeps insertion order
#[derive(Debug, Default)]
pub struct MapBuilder {
    entries: Vec<(Value, Value)>,
}

impl MapBuilder {
    /// Create a new empty map builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn insert(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Append an entry if the value is present
    pub fn insert_opt(self, key: impl Into<Value>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.insert(key, value),
            None => self,
        }
    }

    /// Finish the map
    pub fn build(self) -> Value {
        Value::Map(self.entries)
    }

    /// Finish and encode the map
    pub fn encode(self) -> Result<Vec<u8>> {
        encode(&self.build())
    }
}

/// Encode a value to CBOR bytes
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut encoder = Encoder::default();
    encoder.value(value)?;
    Ok(encoder.into_bytes())
}

/// Streaming CBOR writer backed by a growable buffer
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Bytes written so far
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write one value
    pub fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.buf.push(simple::NULL),
            Value::Undefined => self.buf.push(simple::UNDEFINED),
            Value::Bool(false) => self.buf.push(simple::FALSE),
            Value::Bool(true) => self.buf.push(simple::TRUE),
            Value::Integer(n) => self.integer(*n)?,
            Value::Float(f) => self.float(*f)?,
            Value::Bytes(bytes) => {
                self.head(major::BYTES, bytes.len() as u64);
                self.buf.extend_from_slice(bytes);
            }
            Value::Text(text) => {
                self.head(major::TEXT, text.len() as u64);
                self.buf.extend_from_slice(text.as_bytes());
            }
            Value::Array(items) => {
                self.head(major::ARRAY, items.len() as u64);
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Map(entries) => {
                self.head(major::MAP, entries.len() as u64);
                for (key, value) in entries {
                    self.value(key)?;
                    self.value(value)?;
                }
            }
        }
        Ok(())
    }

    /// Write an initial byte and its argument in the shortest form
    fn head(&mut self, major: u8, argument: u64) {
        let major = major << 5;

        if argument < 24 {
            self.buf.push(major | argument as u8);
        } else if argument <= u8::MAX as u64 {
            self.buf.push(major | 0x18);
            self.buf.push(argument as u8);
        } else if argument <= u16::MAX as u64 {
            self.buf.push(major | 0x19);
            self.buf.extend_from_slice(&(argument as u16).to_be_bytes());
        } else if argument <= u32::MAX as u64 {
            self.buf.push(major | 0x1a);
            self.buf.extend_from_slice(&(argument as u32).to_be_bytes());
        } else {
            // 64-bit arguments are written as high and low 32-bit halves
            let high = (argument >> 32) as u32;
            let low = argument as u32;
            self.buf.push(major | 0x1b);
            self.buf.extend_from_slice(&high.to_be_bytes());
            self.buf.extend_from_slice(&low.to_be_bytes());
        }
    }

    fn integer(&mut self, n: i128) -> Result<()> {
        if n >= 0 {
            if n > MAX_ARGUMENT {
                return Err(Error::UnsupportedType {
                    kind: "integer above 2^64-1",
                });
            }
            self.head(major::UNSIGNED, n as u64);
        } else {
            let argument = -1 - n;
            if argument > MAX_ARGUMENT {
                return Err(Error::UnsupportedType {
                    kind: "integer below -2^64",
                });
            }
            self.head(major::NEGATIVE, argument as u64);
        }
        Ok(())
    }

    fn float(&mut self, f: f64) -> Result<()> {
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(Error::UnsupportedType {
                kind: "non-integral number",
            });
        }
        if !(-TWO_POW_64..TWO_POW_64).contains(&f) {
            return Err(Error::UnsupportedType {
                kind: "number outside the 64-bit range",
            });
        }

        // -0.0 compares equal to 0.0 and lands on major type 0
        if f >= 0.0 {
            self.head(major::UNSIGNED, f as u64);
            Ok(())
        } else {
            self.integer(f as i128)
        }
    }
}
