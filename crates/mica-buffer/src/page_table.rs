//! Page-identity table mapping resident pages to frames.

use crate::frame::FrameId;
use mica_common::{MicaError, PageId, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Lookup table from page identity to the frame holding the page.
///
/// At most one live frame per identity: entries are inserted only alongside
/// a frame being set valid and removed exactly when that frame is cleared.
/// Inserting an identity that is already mapped, or removing one that is
/// absent, indicates broken pool bookkeeping and fails loudly.
pub struct PageTable {
    inner: Mutex<HashMap<PageId, FrameId>>,
}

impl PageTable {
    /// Creates a new page table with capacity for the given frame count.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Looks up a page identity and returns its frame if resident.
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        self.inner.lock().get(&page_id).copied()
    }

    /// Returns true if the page identity is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().contains_key(&page_id)
    }

    /// Inserts a page-to-frame mapping.
    pub fn insert(&self, page_id: PageId, frame_id: FrameId) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.contains_key(&page_id) {
            return Err(MicaError::PageAlreadyMapped { page_id });
        }
        inner.insert(page_id, frame_id);
        Ok(())
    }

    /// Removes a page-to-frame mapping, returning the frame it occupied.
    pub fn remove(&self, page_id: PageId) -> Result<FrameId> {
        self.inner
            .lock()
            .remove(&page_id)
            .ok_or(MicaError::PageNotMapped { page_id })
    }

    /// Returns the number of resident pages.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if no pages are resident.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Calls the provided function for each entry; stops early on false.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(PageId, FrameId) -> bool,
    {
        for (&page_id, &frame_id) in self.inner.lock().iter() {
            if !f(page_id, frame_id) {
                return;
            }
        }
    }
}
