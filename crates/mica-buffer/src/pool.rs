//! Buffer pool manager.

use crate::frame::{BufferFrame, FrameId};
use crate::page_table::PageTable;
use crate::store::PageStore;
use mica_common::{MicaError, PageId, Result, PAGE_SIZE};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use sysinfo::System;

/// Configuration for the buffer pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Buffer pool manager.
///
/// Owns a fixed array of page frames, the page-identity table, and the clock
/// hand, and mediates all page-level I/O against a [`PageStore`]:
/// - cache misses evict an unpinned, unreferenced victim via the clock sweep
/// - dirty victims are written back before their frame is reused
/// - pin counts guard resident pages from eviction
pub struct BufferPool {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames.
    frames: Vec<BufferFrame>,
    /// Page identity to frame mapping.
    page_table: PageTable,
    /// Physical page storage.
    store: Arc<dyn PageStore>,
    /// Clock hand position for the eviction sweep.
    clock_hand: Mutex<usize>,
    /// Number of page accesses served (hits and misses).
    accesses: AtomicU64,
    /// Number of physical page reads.
    disk_reads: AtomicU64,
    /// Number of physical page writes.
    disk_writes: AtomicU64,
}

impl BufferPool {
    /// Creates a new buffer pool over the given page store.
    pub fn new(config: BufferPoolConfig, store: Arc<dyn PageStore>) -> Self {
        let num_frames = config.num_frames;
        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        Self {
            config,
            frames,
            page_table: PageTable::new(num_frames),
            store,
            // Start just before frame 0 so the first sweep begins there.
            clock_hand: Mutex::new(num_frames.saturating_sub(1)),
            accesses: AtomicU64::new(0),
            disk_reads: AtomicU64::new(0),
            disk_writes: AtomicU64::new(0),
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM,
    /// with a floor of 64 frames.
    pub fn auto_sized(store: Arc<dyn PageStore>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_frames = (target_bytes / PAGE_SIZE).max(64);

        Self::new(BufferPoolConfig { num_frames }, store)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Checks if a page is resident in the pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    /// Fetches a page, reading it from the store on a miss.
    ///
    /// The returned frame is pinned with its reference bit set; the caller
    /// must balance this with exactly one `unpin_page`.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        self.accesses.fetch_add(1, Ordering::Relaxed);

        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            return Ok(frame);
        }

        let frame_id = self.evict_frame()?;
        let frame = &self.frames[frame_id.0 as usize];
        let read_result = {
            let mut data = frame.write_data();
            self.store.read_page(page_id, &mut data)
        };
        if let Err(err) = read_result {
            // Keep the invariant that invalid frames hold zeroed buffers
            frame.clear();
            return Err(err);
        }
        self.disk_reads.fetch_add(1, Ordering::Relaxed);
        frame.set(page_id);
        frame.pin();
        self.page_table.insert(page_id, frame_id)?;
        Ok(frame)
    }

    /// Allocates a new page in the given file and installs it in the pool.
    ///
    /// The store hands out a zeroed page; the returned frame is pinned.
    pub fn alloc_page(&self, file_id: u32) -> Result<(PageId, &BufferFrame)> {
        self.accesses.fetch_add(1, Ordering::Relaxed);

        let page_num = self.store.allocate_page(file_id)?;
        let page_id = PageId::new(file_id, page_num);

        let frame_id = self.evict_frame()?;
        let frame = &self.frames[frame_id.0 as usize];
        // The victim frame was cleared by the sweep, so its buffer already
        // matches the zeroed page the store allocated.
        frame.set(page_id);
        frame.pin();
        self.page_table.insert(page_id, frame_id)?;
        Ok((page_id, frame))
    }

    /// Unpins a page, optionally marking it dirty.
    ///
    /// A true `is_dirty` sets the dirty flag; a false one never clears it —
    /// a page dirtied once stays dirty until flushed. Unpinning a page whose
    /// pin count is already zero fails with `PageNotPinned`; unpinning a page
    /// that is not resident is silently ignored, since the page may have
    /// legitimately evicted itself already.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.0 as usize];

        if frame.pin_count() == 0 {
            return Err(MicaError::PageNotPinned { page_id });
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        frame.unpin();
        Ok(())
    }

    /// Best-effort unpin for teardown paths (destructors, scan cleanup).
    ///
    /// Swallows every failure; use `unpin_page` everywhere else.
    pub fn unpin_page_best_effort(&self, page_id: PageId) {
        let _ = self.unpin_page(page_id, false);
    }

    /// Writes back and releases every resident page of the given file.
    ///
    /// Fails with `PagePinned` if any page of the file is still pinned and
    /// with `BadBuffer` if a frame claims ownership by the file while marked
    /// invalid (inconsistent bookkeeping).
    pub fn flush_file(&self, file_id: u32) -> Result<()> {
        for frame in &self.frames {
            let Some(page_id) = frame.page_id() else {
                continue;
            };
            if page_id.file_id != file_id {
                continue;
            }
            if frame.is_pinned() {
                return Err(MicaError::PagePinned { page_id });
            }
            if !frame.is_valid() {
                return Err(MicaError::BadBuffer {
                    frame_id: frame.frame_id().0,
                });
            }
            if frame.is_dirty() {
                {
                    let data = frame.read_data();
                    self.store.write_page(page_id, &data)?;
                }
                self.disk_writes.fetch_add(1, Ordering::Relaxed);
                frame.set_dirty(false);
            }
            self.page_table.remove(page_id)?;
            frame.clear();
        }
        Ok(())
    }

    /// Drops a page from the pool and deletes it from the store.
    ///
    /// The store is asked to delete the page regardless of residency.
    pub fn dispose_page(&self, page_id: PageId) -> Result<()> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.clear();
            self.page_table.remove(page_id)?;
        }
        self.store.delete_page(page_id)
    }

    /// Returns the frame holding an already-pinned page without pinning it
    /// again. The caller must hold a pin on the page.
    pub fn peek_frame(&self, page_id: PageId) -> Option<&BufferFrame> {
        let frame_id = self.page_table.get(page_id)?;
        Some(&self.frames[frame_id.0 as usize])
    }

    /// Selects a frame for reuse via the clock (second-chance) sweep.
    ///
    /// Classification under the hand: invalid frames are immediately usable;
    /// a set reference bit is cleared and the hand advances (second chance);
    /// pinned frames are skipped and counted; otherwise the frame is the
    /// victim, written back first if dirty.
    ///
    /// Only pinned skips count toward the exhaustion budget, and a
    /// reference-bit clear resets the count, so the sweep fails with
    /// `BufferExceeded` exactly when one full rotation saw nothing but
    /// pinned frames.
    fn evict_frame(&self) -> Result<FrameId> {
        let num_frames = self.frames.len();
        let mut pinned_skips = 0usize;

        loop {
            let hand = self.advance_clock();
            let frame = &self.frames[hand];

            if !frame.is_valid() {
                return Ok(FrameId(hand as u32));
            }

            if frame.reference_bit() {
                frame.set_reference_bit(false);
                pinned_skips = 0;
                continue;
            }

            if frame.is_pinned() {
                pinned_skips += 1;
                if pinned_skips >= num_frames {
                    return Err(MicaError::BufferExceeded);
                }
                continue;
            }

            // Victim found
            if let Some(page_id) = frame.page_id() {
                if frame.is_dirty() {
                    {
                        let data = frame.read_data();
                        self.store.write_page(page_id, &data)?;
                    }
                    self.disk_writes.fetch_add(1, Ordering::Relaxed);
                    frame.set_dirty(false);
                }
                self.page_table.remove(page_id)?;
            }
            frame.clear();
            return Ok(FrameId(hand as u32));
        }
    }

    /// Advances the clock hand, wrapping over the frame table.
    fn advance_clock(&self) -> usize {
        let mut hand = self.clock_hand.lock();
        *hand = (*hand + 1) % self.frames.len();
        *hand
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut valid_frames = 0;
        let mut pinned_frames = 0;
        let mut dirty_frames = 0;

        for frame in &self.frames {
            if frame.is_valid() {
                valid_frames += 1;
                if frame.is_pinned() {
                    pinned_frames += 1;
                }
                if frame.is_dirty() {
                    dirty_frames += 1;
                }
            }
        }

        BufferPoolStats {
            total_frames: self.config.num_frames,
            valid_frames,
            pinned_frames,
            dirty_frames,
            accesses: self.accesses.load(Ordering::Relaxed),
            disk_reads: self.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Renders the frame table for diagnostics.
    pub fn dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut valid_frames = 0;
        for frame in &self.frames {
            let _ = writeln!(out, "{:?}", frame);
            if frame.is_valid() {
                valid_frames += 1;
            }
        }
        let _ = writeln!(out, "valid frames: {}", valid_frames);
        out
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Write back whatever is still dirty; nothing to report to on failure.
        for frame in &self.frames {
            if frame.is_valid() && frame.is_dirty() {
                if let Some(page_id) = frame.page_id() {
                    let data = frame.read_data();
                    let _ = self.store.write_page(page_id, &data);
                }
            }
        }
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    /// Total number of frames.
    pub total_frames: usize,
    /// Number of frames holding live pages.
    pub valid_frames: usize,
    /// Number of pinned frames.
    pub pinned_frames: usize,
    /// Number of dirty frames.
    pub dirty_frames: usize,
    /// Page accesses served.
    pub accesses: u64,
    /// Physical page reads performed.
    pub disk_reads: u64,
    /// Physical page writes performed.
    pub disk_writes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory page store recording physical I/O for assertions.
    struct MemStore {
        pages: Mutex<HashMap<PageId, Box<[u8; PAGE_SIZE]>>>,
        next_page: Mutex<HashMap<u32, u32>>,
        writes: Mutex<Vec<PageId>>,
        deletes: Mutex<Vec<PageId>>,
    }

    impl MemStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(HashMap::new()),
                next_page: Mutex::new(HashMap::new()),
                writes: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
            })
        }

        fn writes_of(&self, page_id: PageId) -> usize {
            self.writes.lock().iter().filter(|&&p| p == page_id).count()
        }

        fn stored_byte(&self, page_id: PageId, offset: usize) -> u8 {
            self.pages.lock()[&page_id][offset]
        }
    }

    impl PageStore for MemStore {
        fn allocate_page(&self, file_id: u32) -> Result<u32> {
            let mut next = self.next_page.lock();
            let page_num = next.entry(file_id).or_insert(0);
            *page_num += 1;
            self.pages
                .lock()
                .insert(PageId::new(file_id, *page_num), Box::new([0u8; PAGE_SIZE]));
            Ok(*page_num)
        }

        fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
            let pages = self.pages.lock();
            let data = pages
                .get(&page_id)
                .ok_or(MicaError::PageNotFound { page_id })?;
            buf.copy_from_slice(&data[..]);
            Ok(())
        }

        fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
            self.pages.lock().insert(page_id, Box::new(*data));
            self.writes.lock().push(page_id);
            Ok(())
        }

        fn delete_page(&self, page_id: PageId) -> Result<()> {
            self.pages.lock().remove(&page_id);
            self.deletes.lock().push(page_id);
            Ok(())
        }

        fn file_name(&self, file_id: u32) -> String {
            format!("mem:{}", file_id)
        }
    }

    fn create_test_pool(num_frames: usize) -> (BufferPool, Arc<MemStore>) {
        let store = MemStore::new();
        let pool = BufferPool::new(BufferPoolConfig { num_frames }, store.clone());
        (pool, store)
    }

    /// Seeds a page directly in the store with a marker byte.
    fn seed_page(store: &MemStore, file_id: u32, byte: u8) -> PageId {
        let page_num = store.allocate_page(file_id).unwrap();
        let page_id = PageId::new(file_id, page_num);
        store
            .write_page(page_id, &{
                let mut data = [0u8; PAGE_SIZE];
                data[0] = byte;
                data
            })
            .unwrap();
        store.writes.lock().clear();
        page_id
    }

    #[test]
    fn test_pool_new() {
        let (pool, _store) = create_test_pool(10);
        assert_eq!(pool.num_frames(), 10);
        assert_eq!(pool.page_count(), 0);
    }

    #[test]
    fn test_fetch_reads_from_store() {
        let (pool, store) = create_test_pool(4);
        let page_id = seed_page(&store, 0, 0xAB);

        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.page_id(), Some(page_id));
        assert_eq!(frame.pin_count(), 1);
        assert!(frame.reference_bit());
        assert_eq!(frame.read_data()[0], 0xAB);
        assert!(pool.contains(page_id));
        assert_eq!(pool.stats().disk_reads, 1);
    }

    #[test]
    fn test_fetch_hit_pins_again() {
        let (pool, store) = create_test_pool(4);
        let page_id = seed_page(&store, 0, 1);

        pool.fetch_page(page_id).unwrap();
        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.pin_count(), 2);
        // Second fetch was a hit
        assert_eq!(pool.stats().disk_reads, 1);
    }

    #[test]
    fn test_pin_unpin_balance_makes_frame_evictable() {
        let (pool, store) = create_test_pool(1);
        let a = seed_page(&store, 0, 1);
        let b = seed_page(&store, 0, 2);

        pool.fetch_page(a).unwrap();
        pool.fetch_page(a).unwrap();
        pool.unpin_page(a, false).unwrap();
        pool.unpin_page(a, false).unwrap();

        // Pin count back to zero: the single frame can now be reused
        pool.fetch_page(b).unwrap();
        assert!(pool.contains(b));
        assert!(!pool.contains(a));
    }

    #[test]
    fn test_alloc_page_numbers_from_one() {
        let (pool, _store) = create_test_pool(4);

        let (first, frame) = pool.alloc_page(0).unwrap();
        assert_eq!(first.page_num, 1);
        assert_eq!(frame.pin_count(), 1);
        assert_eq!(frame.read_data()[0], 0);

        let (second, _) = pool.alloc_page(0).unwrap();
        assert_eq!(second.page_num, 2);
        assert_eq!(pool.page_count(), 2);
    }

    #[test]
    fn test_eviction_removes_exactly_one_identity() {
        let (pool, store) = create_test_pool(3);
        let pages: Vec<_> = (0..3).map(|i| seed_page(&store, 0, i)).collect();

        for &p in &pages {
            pool.fetch_page(p).unwrap();
            pool.unpin_page(p, false).unwrap();
        }
        assert_eq!(pool.page_count(), 3);

        let extra = seed_page(&store, 0, 99);
        pool.fetch_page(extra).unwrap();

        assert_eq!(pool.page_count(), 3);
        assert!(pool.contains(extra));
        let survivors = pages.iter().filter(|&&p| pool.contains(p)).count();
        assert_eq!(survivors, 2);
    }

    #[test]
    fn test_eviction_never_takes_pinned_frame() {
        let (pool, store) = create_test_pool(3);
        let pinned = seed_page(&store, 0, 1);
        let loose_a = seed_page(&store, 0, 2);
        let loose_b = seed_page(&store, 0, 3);

        pool.fetch_page(pinned).unwrap();
        for &p in &[loose_a, loose_b] {
            pool.fetch_page(p).unwrap();
            pool.unpin_page(p, false).unwrap();
        }

        // Evict twice; the pinned page must survive both
        for byte in [10, 11] {
            let extra = seed_page(&store, 0, byte);
            pool.fetch_page(extra).unwrap();
            pool.unpin_page(extra, false).unwrap();
            assert!(pool.contains(pinned));
        }
    }

    #[test]
    fn test_second_chance_spares_referenced_frame() {
        let (pool, store) = create_test_pool(3);
        let a = seed_page(&store, 0, 1);
        let b = seed_page(&store, 0, 2);
        let c = seed_page(&store, 0, 3);

        for &p in &[a, b, c] {
            pool.fetch_page(p).unwrap();
            pool.unpin_page(p, false).unwrap();
        }

        // First miss clears every reference bit, then takes frame 0 (a)
        let d = seed_page(&store, 0, 4);
        pool.fetch_page(d).unwrap();
        pool.unpin_page(d, false).unwrap();
        assert!(!pool.contains(a));

        // Touch b: its reference bit grants it a second chance
        pool.fetch_page(b).unwrap();
        pool.unpin_page(b, false).unwrap();

        let e = seed_page(&store, 0, 5);
        pool.fetch_page(e).unwrap();

        assert!(pool.contains(b));
        assert!(!pool.contains(c));
    }

    #[test]
    fn test_buffer_exceeded_when_all_pinned() {
        let (pool, store) = create_test_pool(2);
        let a = seed_page(&store, 0, 1);
        let b = seed_page(&store, 0, 2);
        let c = seed_page(&store, 0, 3);

        pool.fetch_page(a).unwrap();
        pool.fetch_page(b).unwrap();

        let err = pool.fetch_page(c).unwrap_err();
        assert!(matches!(err, MicaError::BufferExceeded));

        // Releasing one pin makes the fetch succeed
        pool.unpin_page(a, false).unwrap();
        pool.fetch_page(c).unwrap();
        assert!(pool.contains(c));
    }

    #[test]
    fn test_sweep_finds_victim_among_pinned_frames() {
        let (pool, store) = create_test_pool(3);
        let a = seed_page(&store, 0, 1);
        let b = seed_page(&store, 0, 2);
        let c = seed_page(&store, 0, 3);

        pool.fetch_page(a).unwrap();
        pool.fetch_page(b).unwrap();
        pool.fetch_page(c).unwrap();
        pool.unpin_page(c, false).unwrap();

        // Two of three frames pinned; the sweep must still find c
        let d = seed_page(&store, 0, 4);
        pool.fetch_page(d).unwrap();
        assert!(pool.contains(d));
        assert!(!pool.contains(c));
    }

    #[test]
    fn test_dirty_eviction_writes_back_mutated_contents() {
        let (pool, store) = create_test_pool(1);

        let (page_id, frame) = pool.alloc_page(0).unwrap();
        frame.write_data()[0] = 0xCD;
        pool.unpin_page(page_id, true).unwrap();
        assert_eq!(store.writes_of(page_id), 0);

        // Allocating another page evicts the dirty one
        pool.alloc_page(0).unwrap();
        assert_eq!(store.writes_of(page_id), 1);
        assert_eq!(store.stored_byte(page_id, 0), 0xCD);
        assert!(!pool.contains(page_id));
    }

    #[test]
    fn test_clean_eviction_does_not_write() {
        let (pool, store) = create_test_pool(1);
        let a = seed_page(&store, 0, 1);
        let b = seed_page(&store, 0, 2);

        pool.fetch_page(a).unwrap();
        pool.unpin_page(a, false).unwrap();

        pool.fetch_page(b).unwrap();
        assert_eq!(store.writes_of(a), 0);
    }

    #[test]
    fn test_dirty_flag_sticks_across_clean_unpin() {
        let (pool, store) = create_test_pool(2);
        let a = seed_page(&store, 0, 1);

        let frame = pool.fetch_page(a).unwrap();
        frame.write_data()[0] = 0x77;
        pool.unpin_page(a, true).unwrap();

        // A later clean unpin must not clear the dirty flag
        pool.fetch_page(a).unwrap();
        pool.unpin_page(a, false).unwrap();
        let frame = pool.peek_frame(a).unwrap();
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_unpin_not_pinned_fails() {
        let (pool, store) = create_test_pool(2);
        let a = seed_page(&store, 0, 1);

        pool.fetch_page(a).unwrap();
        pool.unpin_page(a, false).unwrap();

        let err = pool.unpin_page(a, false).unwrap_err();
        assert!(matches!(err, MicaError::PageNotPinned { .. }));
    }

    #[test]
    fn test_unpin_missing_page_is_silent() {
        let (pool, _store) = create_test_pool(2);
        pool.unpin_page(PageId::new(0, 99), true).unwrap();
    }

    #[test]
    fn test_flush_file_writes_dirty_and_clears_frames() {
        let (pool, store) = create_test_pool(4);

        let (dirty_page, frame) = pool.alloc_page(0).unwrap();
        frame.write_data()[0] = 0x11;
        pool.unpin_page(dirty_page, true).unwrap();

        let (clean_page, _) = pool.alloc_page(0).unwrap();
        pool.unpin_page(clean_page, false).unwrap();

        let (other_file, _) = pool.alloc_page(1).unwrap();
        pool.unpin_page(other_file, false).unwrap();

        store.writes.lock().clear();
        pool.flush_file(0).unwrap();

        assert_eq!(store.writes_of(dirty_page), 1);
        assert_eq!(store.writes_of(clean_page), 0);
        assert!(!pool.contains(dirty_page));
        assert!(!pool.contains(clean_page));
        assert!(pool.contains(other_file));
    }

    #[test]
    fn test_flush_file_fails_on_pinned_page() {
        let (pool, _store) = create_test_pool(4);
        let (page_id, _) = pool.alloc_page(0).unwrap();

        let err = pool.flush_file(0).unwrap_err();
        assert!(matches!(err, MicaError::PagePinned { .. }));

        pool.unpin_page(page_id, false).unwrap();
        pool.flush_file(0).unwrap();
    }

    #[test]
    fn test_dispose_page_resident() {
        let (pool, store) = create_test_pool(4);
        let (page_id, _) = pool.alloc_page(0).unwrap();
        pool.unpin_page(page_id, false).unwrap();

        pool.dispose_page(page_id).unwrap();
        assert!(!pool.contains(page_id));
        assert_eq!(store.deletes.lock().as_slice(), &[page_id]);
    }

    #[test]
    fn test_dispose_page_not_resident_still_deletes() {
        let (pool, store) = create_test_pool(4);
        let page_id = seed_page(&store, 0, 1);

        pool.dispose_page(page_id).unwrap();
        assert_eq!(store.deletes.lock().as_slice(), &[page_id]);
    }

    #[test]
    fn test_drop_writes_back_dirty_frames() {
        let store = MemStore::new();
        let page_id;
        {
            let pool = BufferPool::new(BufferPoolConfig { num_frames: 2 }, store.clone());
            let (pid, frame) = pool.alloc_page(0).unwrap();
            frame.write_data()[0] = 0xEE;
            pool.unpin_page(pid, true).unwrap();
            page_id = pid;
        }
        assert_eq!(store.writes_of(page_id), 1);
        assert_eq!(store.stored_byte(page_id, 0), 0xEE);
    }

    #[test]
    fn test_stats_and_dump() {
        let (pool, store) = create_test_pool(4);
        let a = seed_page(&store, 0, 1);

        pool.fetch_page(a).unwrap();
        let (b, frame) = pool.alloc_page(0).unwrap();
        frame.write_data()[0] = 1;
        pool.unpin_page(b, true).unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total_frames, 4);
        assert_eq!(stats.valid_frames, 2);
        assert_eq!(stats.pinned_frames, 1);
        assert_eq!(stats.dirty_frames, 1);
        assert_eq!(stats.disk_reads, 1);

        let dump = pool.dump();
        assert!(dump.contains("valid frames: 2"));
        assert!(dump.contains("BufferFrame"));
    }
}
