//! Buffer pool management for MicaDB.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - Clock (second-chance) eviction over the frame table
//! - Pin counting with fail-on-over-unpin semantics
//! - Dirty page tracking with write-back on eviction and flush

mod frame;
mod page_table;
mod pool;
mod store;

pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPool, BufferPoolConfig, BufferPoolStats};
pub use store::PageStore;
