//! Error types for MicaDB.

use crate::page::PageId;
use thiserror::Error;

/// Result type alias using MicaError.
pub type Result<T> = std::result::Result<T, MicaError>;

/// Errors that can occur in MicaDB operations.
#[derive(Debug, Error)]
pub enum MicaError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: PageId },

    #[error("Page corrupted: {page_id}, reason: {reason}")]
    PageCorrupted { page_id: PageId, reason: String },

    // Buffer pool errors
    #[error("Buffer pool exceeded: every frame is pinned")]
    BufferExceeded,

    #[error("Page not pinned: {page_id}")]
    PageNotPinned { page_id: PageId },

    #[error("Page pinned: {page_id}")]
    PagePinned { page_id: PageId },

    #[error("Bad buffer: frame {frame_id} owned by a file but invalid")]
    BadBuffer { frame_id: u32 },

    #[error("Page already mapped to a frame: {page_id}")]
    PageAlreadyMapped { page_id: PageId },

    #[error("Page not mapped to a frame: {page_id}")]
    PageNotMapped { page_id: PageId },

    // Index errors
    #[error("Bad index info: {reason}")]
    BadIndexInfo { reason: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Record too short: attribute at offset {offset} in {len}-byte record")]
    RecordTooShort { offset: usize, len: usize },

    // Scan protocol
    #[error("Bad opcodes: low operator must be GT/GTE, high operator must be LT/LTE")]
    BadOpcodes,

    #[error("Bad scan range: low bound exceeds high bound")]
    BadScanrange,

    #[error("Scan not initialized")]
    ScanNotInitialized,

    #[error("Index scan completed")]
    IndexScanCompleted,

    // Relation scan
    #[error("End of relation")]
    EndOfRelation,

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
