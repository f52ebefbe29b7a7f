//! Record identifiers and indexable key types.

use crate::page::INVALID_PAGE_NUM;
use serde::{Deserialize, Serialize};

/// Identifier for a tuple in a base relation: a page number plus a slot.
///
/// Record identifiers are stored verbatim in index leaves and never
/// interpreted by the index. A record identifier with page number 0 marks
/// an empty leaf slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Page number of the page holding the record (1-indexed; 0 = none).
    pub page_num: u32,
    /// Slot of the record within its page.
    pub slot_num: u16,
}

impl RecordId {
    /// On-page encoding width in bytes (page_num + slot_num + 2 reserved).
    pub const WIDTH: usize = 8;

    /// Creates a new RecordId.
    pub fn new(page_num: u32, slot_num: u16) -> Self {
        Self { page_num, slot_num }
    }

    /// Returns true if this identifier refers to a real record.
    pub fn is_valid(&self) -> bool {
        self.page_num != INVALID_PAGE_NUM
    }

    /// Serializes to the fixed on-page encoding.
    pub fn to_bytes(&self) -> [u8; Self::WIDTH] {
        let mut buf = [0u8; Self::WIDTH];
        buf[0..4].copy_from_slice(&self.page_num.to_le_bytes());
        buf[4..6].copy_from_slice(&self.slot_num.to_le_bytes());
        // bytes 6-7 are reserved (already zeroed)
        buf
    }

    /// Deserializes from the fixed on-page encoding.
    pub fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_num: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            slot_num: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.page_num, self.slot_num)
    }
}

/// Attribute type an index is built over.
///
/// The tag is persisted as a single byte in the index meta page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyType {
    /// 32-bit signed integer keys.
    Int32 = 0,
    /// 64-bit floating point keys.
    Float64 = 1,
    /// Fixed-length byte-string keys.
    FixedStr = 2,
}

impl KeyType {
    /// Returns the persisted byte tag.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a persisted byte tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(KeyType::Int32),
            1 => Some(KeyType::Float64),
            2 => Some(KeyType::FixedStr),
            _ => None,
        }
    }

    /// Human-readable type name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            KeyType::Int32 => "INT32",
            KeyType::Float64 => "FLOAT64",
            KeyType::FixedStr => "FIXEDSTR",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
