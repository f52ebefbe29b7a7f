//! Storage engine for MicaDB.
//!
//! This crate provides:
//! - Disk manager for page-level I/O over named page files
//! - The base-relation scan contract consumed by index bulk loads
//! - A multi-type B+Tree index built entirely on the buffer pool

mod btree;
mod disk;
mod relation;

pub use btree::{BTreeIndex, IndexKey, KeyValue, Operator, StrKey, STRING_KEY_LEN};
pub use disk::{DiskManager, DiskManagerConfig};
pub use relation::{RelationSource, VecRelation};
