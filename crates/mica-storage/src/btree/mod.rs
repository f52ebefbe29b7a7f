//! B+Tree index over the buffer pool.
//!
//! Structure:
//! - `key` — key types and the capability trait the engine is generic over
//! - `node` — leaf/internal page layouts (the only byte-level module)
//! - `meta` — the index meta page (configuration + current root)
//! - `index` — the engine: open/create, recursive insert with splits, and
//!   single-cursor range scans over the leaf sibling chain

mod index;
mod key;
mod meta;
mod node;

pub use index::{BTreeIndex, Operator};
pub use key::{IndexKey, KeyValue, StrKey, STRING_KEY_LEN};
