//! Base-relation scan contract consumed by index bulk loads.

use bytes::Bytes;
use mica_common::{MicaError, RecordId, Result};
use std::collections::VecDeque;

/// Sequential source of base-relation records.
///
/// The index only consumes this during its initial bulk load: each call
/// yields the next record's identifier and raw bytes, and the source raises
/// `EndOfRelation` when exhausted.
pub trait RelationSource {
    /// Returns the next record, or `EndOfRelation` when none remain.
    fn scan_next(&mut self) -> Result<(RecordId, Bytes)>;
}

/// In-memory relation backed by a queue of records.
#[derive(Debug, Default)]
pub struct VecRelation {
    records: VecDeque<(RecordId, Bytes)>,
}

impl VecRelation {
    /// Creates an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, rid: RecordId, record: Bytes) {
        self.records.push_back((rid, record));
    }

    /// Returns the number of records left to scan.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are left to scan.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(RecordId, Bytes)> for VecRelation {
    fn from_iter<I: IntoIterator<Item = (RecordId, Bytes)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl RelationSource for VecRelation {
    fn scan_next(&mut self) -> Result<(RecordId, Bytes)> {
        self.records.pop_front().ok_or(MicaError::EndOfRelation)
    }
}
