//! Key types and the key-capability trait for the B+Tree.

use mica_common::{KeyType, MicaError, Result};
use std::cmp::Ordering;

/// Width of fixed-length string keys in bytes.
pub const STRING_KEY_LEN: usize = 10;

/// Fixed-length byte-string key.
///
/// Construction is a bounded copy: at most [`STRING_KEY_LEN`] bytes are
/// taken from the source and shorter sources are zero-padded, so a key can
/// be built from an unterminated buffer without reading past its width.
/// Comparison is bounded byte comparison over the fixed array.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrKey(pub [u8; STRING_KEY_LEN]);

impl StrKey {
    /// Builds a key from up to [`STRING_KEY_LEN`] bytes of `src`.
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut buf = [0u8; STRING_KEY_LEN];
        let len = src.len().min(STRING_KEY_LEN);
        buf[..len].copy_from_slice(&src[..len]);
        Self(buf)
    }
}

impl From<&str> for StrKey {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl std::fmt::Debug for StrKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Trim zero padding for readability
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        write!(f, "StrKey({:?})", String::from_utf8_lossy(&self.0[..end]))
    }
}

/// An untyped key value as handed to the public index surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    /// 32-bit signed integer key.
    Int(i32),
    /// 64-bit floating point key.
    Double(f64),
    /// Fixed-length string key.
    Str(StrKey),
}

impl KeyValue {
    /// Returns the attribute type this value belongs to.
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyValue::Int(_) => KeyType::Int32,
            KeyValue::Double(_) => KeyType::Float64,
            KeyValue::Str(_) => KeyType::FixedStr,
        }
    }

    /// Extracts the indexed attribute of a record.
    pub fn from_record(record: &[u8], offset: usize, key_type: KeyType) -> Result<Self> {
        match key_type {
            KeyType::Int32 => Ok(KeyValue::Int(i32::from_record(record, offset)?)),
            KeyType::Float64 => Ok(KeyValue::Double(f64::from_record(record, offset)?)),
            KeyType::FixedStr => Ok(KeyValue::Str(StrKey::from_record(record, offset)?)),
        }
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Int(value)
    }
}

impl From<f64> for KeyValue {
    fn from(value: f64) -> Self {
        KeyValue::Double(value)
    }
}

impl From<StrKey> for KeyValue {
    fn from(value: StrKey) -> Self {
        KeyValue::Str(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Str(StrKey::from(value))
    }
}

/// Capability set a key type needs for node storage and ordering:
/// a fixed serialized width, encode/decode at that width, a three-way
/// comparison, and conversions from untyped values and raw records.
pub trait IndexKey: Copy {
    /// Serialized width in bytes.
    const WIDTH: usize;

    /// Writes the key into `buf` (exactly `WIDTH` bytes).
    fn encode(&self, buf: &mut [u8]);

    /// Reads a key from `buf` (exactly `WIDTH` bytes).
    fn decode(buf: &[u8]) -> Self;

    /// Three-way comparison.
    fn cmp_key(&self, other: &Self) -> Ordering;

    /// Converts an untyped key value, failing on a type mismatch.
    fn from_value(value: &KeyValue) -> Result<Self>;

    /// Extracts the key from a record at the given byte offset.
    fn from_record(record: &[u8], offset: usize) -> Result<Self> {
        if record.len() < offset + Self::WIDTH {
            return Err(MicaError::RecordTooShort {
                offset,
                len: record.len(),
            });
        }
        Ok(Self::decode(&record[offset..offset + Self::WIDTH]))
    }
}

impl IndexKey for i32 {
    const WIDTH: usize = 4;

    fn encode(&self, buf: &mut [u8]) {
        buf[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn from_value(value: &KeyValue) -> Result<Self> {
        match value {
            KeyValue::Int(v) => Ok(*v),
            other => Err(MicaError::TypeMismatch {
                expected: KeyType::Int32.name().to_string(),
                actual: other.key_type().name().to_string(),
            }),
        }
    }
}

impl IndexKey for f64 {
    const WIDTH: usize = 8;

    fn encode(&self, buf: &mut [u8]) {
        buf[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        f64::from_le_bytes([
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ])
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn from_value(value: &KeyValue) -> Result<Self> {
        match value {
            KeyValue::Double(v) => Ok(*v),
            other => Err(MicaError::TypeMismatch {
                expected: KeyType::Float64.name().to_string(),
                actual: other.key_type().name().to_string(),
            }),
        }
    }
}

impl IndexKey for StrKey {
    const WIDTH: usize = STRING_KEY_LEN;

    fn encode(&self, buf: &mut [u8]) {
        buf[..Self::WIDTH].copy_from_slice(&self.0);
    }

    fn decode(buf: &[u8]) -> Self {
        Self::from_bytes(&buf[..Self::WIDTH])
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }

    fn from_value(value: &KeyValue) -> Result<Self> {
        match value {
            KeyValue::Str(v) => Ok(*v),
            other => Err(MicaError::TypeMismatch {
                expected: KeyType::FixedStr.name().to_string(),
                actual: other.key_type().name().to_string(),
            }),
        }
    }

    /// Fixed-string extraction tolerates records whose tail is shorter than
    /// the key width: the available bytes are taken and zero-padded.
    fn from_record(record: &[u8], offset: usize) -> Result<Self> {
        if record.len() <= offset {
            return Err(MicaError::RecordTooShort {
                offset,
                len: record.len(),
            });
        }
        Ok(Self::from_bytes(&record[offset..]))
    }
}
