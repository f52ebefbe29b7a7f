//! Buffer frame management.

use mica_common::{PageId, PAGE_SIZE};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Sentinel value indicating no page identity is recorded in the frame.
const NO_PAGE: u64 = u64::MAX;

/// Unique identifier for a frame in the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u32);

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// A frame in the buffer pool holding a single page.
///
/// Each frame carries the page data plus the bookkeeping the pool needs:
/// owning page identity, validity, pin count, dirty flag, and the reference
/// bit consumed by the clock sweep.
pub struct BufferFrame {
    /// Frame identifier.
    frame_id: FrameId,
    /// Identity of the page held (packed as u64, NO_PAGE = none).
    page_id: AtomicU64,
    /// Whether the frame holds live data.
    valid: AtomicBool,
    /// Number of active holders of this page.
    pin_count: AtomicU32,
    /// Whether the page has been modified since it was loaded.
    dirty: AtomicBool,
    /// Reference bit for the clock replacement sweep.
    reference_bit: AtomicBool,
    /// Page data buffer.
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicU64::new(NO_PAGE),
            valid: AtomicBool::new(false),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            reference_bit: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page identity recorded in this frame, if any.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let packed = self.page_id.load(Ordering::Acquire);
        if packed == NO_PAGE {
            None
        } else {
            Some(PageId::from_u64(packed))
        }
    }

    /// Returns true if this frame holds live data.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Returns true if this frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Increments the pin count and sets the reference bit.
    #[inline]
    pub fn pin(&self) -> u32 {
        let prev = self.pin_count.fetch_add(1, Ordering::AcqRel);
        self.reference_bit.store(true, Ordering::Relaxed);
        prev + 1
    }

    /// Decrements the pin count, saturating at zero.
    ///
    /// The pool turns an unpin of an already-unpinned frame into an error
    /// before calling this.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let prev = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            self.pin_count.store(0, Ordering::Release);
            return 0;
        }
        prev - 1
    }

    /// Returns true if this frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Sets or clears the dirty flag.
    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Returns the reference bit value.
    #[inline]
    pub fn reference_bit(&self) -> bool {
        self.reference_bit.load(Ordering::Relaxed)
    }

    /// Sets the reference bit.
    #[inline]
    pub fn set_reference_bit(&self, value: bool) {
        self.reference_bit.store(value, Ordering::Relaxed);
    }

    /// Installs a page identity: valid, unpinned, clean, reference bit set.
    #[inline]
    pub fn set(&self, page_id: PageId) {
        self.page_id.store(page_id.as_u64(), Ordering::Release);
        self.valid.store(true, Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.reference_bit.store(true, Ordering::Relaxed);
    }

    /// Resets the frame to the empty state and zeroes its data.
    #[inline]
    pub fn clear(&self) {
        self.page_id.store(NO_PAGE, Ordering::Release);
        self.valid.store(false, Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.reference_bit.store(false, Ordering::Relaxed);
        let mut data = self.data.write();
        data.fill(0);
    }

    /// Reads the page data.
    #[inline]
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Writes to the page data.
    #[inline]
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Copies data into the frame.
    #[inline]
    pub fn copy_from(&self, src: &[u8]) {
        let mut data = self.data.write();
        let len = src.len().min(PAGE_SIZE);
        data[..len].copy_from_slice(&src[..len]);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("valid", &self.is_valid())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .field("reference_bit", &self.reference_bit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_is_empty() {
        let frame = BufferFrame::new(FrameId(3));
        assert_eq!(frame.frame_id(), FrameId(3));
        assert_eq!(frame.page_id(), None);
        assert!(!frame.is_valid());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert!(!frame.reference_bit());
    }

    #[test]
    fn test_frame_set() {
        let frame = BufferFrame::new(FrameId(0));
        let page_id = PageId::new(1, 7);

        frame.set(page_id);

        assert_eq!(frame.page_id(), Some(page_id));
        assert!(frame.is_valid());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert!(frame.reference_bit());
    }

    #[test]
    fn test_frame_pin_unpin_balance() {
        let frame = BufferFrame::new(FrameId(0));
        frame.set(PageId::new(0, 1));

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_frame_unpin_saturates() {
        let frame = BufferFrame::new(FrameId(0));
        assert_eq!(frame.unpin(), 0);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_frame_pin_sets_reference_bit() {
        let frame = BufferFrame::new(FrameId(0));
        frame.set(PageId::new(0, 1));
        frame.set_reference_bit(false);

        frame.pin();
        assert!(frame.reference_bit());
    }

    #[test]
    fn test_frame_clear_resets_everything() {
        let frame = BufferFrame::new(FrameId(0));
        frame.set(PageId::new(2, 5));
        frame.pin();
        frame.set_dirty(true);
        frame.write_data()[0] = 0xAB;

        frame.clear();

        assert_eq!(frame.page_id(), None);
        assert!(!frame.is_valid());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert!(!frame.reference_bit());
        assert_eq!(frame.read_data()[0], 0);
    }

    #[test]
    fn test_frame_copy_from() {
        let frame = BufferFrame::new(FrameId(0));
        let mut src = [0u8; PAGE_SIZE];
        src[0] = 0x12;
        src[PAGE_SIZE - 1] = 0x34;

        frame.copy_from(&src);

        let data = frame.read_data();
        assert_eq!(data[0], 0x12);
        assert_eq!(data[PAGE_SIZE - 1], 0x34);
    }

    #[test]
    fn test_frame_debug_format() {
        let frame = BufferFrame::new(FrameId(9));
        let rendered = format!("{:?}", frame);
        assert!(rendered.contains("frame_id"));
        assert!(rendered.contains("pin_count"));
    }
}
