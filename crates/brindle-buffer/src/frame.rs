//! Buffer frame management.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use brindle_common::page::{PageId, PAGE_SIZE};

/// Sentinel value indicating no page is loaded in the frame.
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
/// Each frame contains the page data (PAGE_SIZE bytes) plus the metadata
/// the pool needs for replacement: which page is resident, how many users
/// hold a pin, and whether the contents diverge from disk.
pub struct BufferFrame {
    /// Frame identifier.
    frame_id: FrameId,
    /// The page currently stored in this frame (packed as u64, NO_PAGE = none).
    /// Layout: upper 32 bits = file_id, lower 32 bits = page_no.
    page_id: AtomicU64,
    /// Page data buffer.
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
    /// Number of users currently holding this page.
    pin_count: AtomicU32,
    /// Whether the page has been modified since it was read from disk.
    is_dirty: AtomicBool,
}

impl BufferFrame {
    /// Creates a new empty buffer frame.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicU64::new(NO_PAGE),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    fn pack_page_id(page_id: PageId) -> u64 {
        ((page_id.file_id as u64) << 32) | (page_id.page_no as u64)
    }

    #[inline(always)]
    fn unpack_page_id(packed: u64) -> PageId {
        PageId {
            file_id: (packed >> 32) as u32,
            page_no: packed as u32,
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page ID currently stored in this frame.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let packed = self.page_id.load(Ordering::Acquire);
        if packed == NO_PAGE {
            None
        } else {
            Some(Self::unpack_page_id(packed))
        }
    }

    /// Sets the page ID for this frame.
    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        let packed = match page_id {
            Some(pid) => Self::pack_page_id(pid),
            None => NO_PAGE,
        };
        self.page_id.store(packed, Ordering::Release);
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count.
    #[inline]
    pub fn pin(&self) {
        self.pin_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the pin count. Returns the new pin count.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let prev = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        if prev == 0 {
            // Underflow protection: restore to 0
            self.pin_count.store(0, Ordering::Release);
            return 0;
        }
        prev - 1
    }

    /// Returns true if this frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count.load(Ordering::Acquire) > 0
    }

    /// Returns true if this frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    /// Marks this frame as dirty or clean.
    #[inline]
    pub fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
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

    /// Resets the frame to empty state.
    pub fn reset(&self) {
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = BufferFrame::new(FrameId(3));
        assert_eq!(frame.frame_id(), FrameId(3));
        assert_eq!(frame.page_id(), None);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_page_id_roundtrip() {
        let frame = BufferFrame::new(FrameId(0));
        let page_id = PageId::new(7, 42);

        frame.set_page_id(Some(page_id));
        assert_eq!(frame.page_id(), Some(page_id));

        frame.set_page_id(None);
        assert_eq!(frame.page_id(), None);
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = BufferFrame::new(FrameId(0));

        frame.pin();
        frame.pin();
        assert_eq!(frame.pin_count(), 2);
        assert!(frame.is_pinned());

        assert_eq!(frame.unpin(), 1);
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    fn test_frame_unpin_underflow() {
        let frame = BufferFrame::new(FrameId(0));
        // Unpin with pin_count == 0 stays at 0
        assert_eq!(frame.unpin(), 0);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_frame_dirty_flag() {
        let frame = BufferFrame::new(FrameId(0));

        frame.set_dirty(true);
        assert!(frame.is_dirty());
        frame.set_dirty(false);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_data_access() {
        let frame = BufferFrame::new(FrameId(0));

        frame.write_data()[0] = 0xAB;
        assert_eq!(frame.read_data()[0], 0xAB);
    }

    #[test]
    fn test_frame_copy_from() {
        let frame = BufferFrame::new(FrameId(0));
        let mut src = [0u8; PAGE_SIZE];
        src[0] = 0x11;
        src[PAGE_SIZE - 1] = 0x22;

        frame.copy_from(&src);
        let data = frame.read_data();
        assert_eq!(data[0], 0x11);
        assert_eq!(data[PAGE_SIZE - 1], 0x22);
    }

    #[test]
    fn test_frame_reset() {
        let frame = BufferFrame::new(FrameId(0));
        frame.set_page_id(Some(PageId::new(1, 1)));
        frame.pin();
        frame.set_dirty(true);
        frame.write_data()[10] = 0xFF;

        frame.reset();

        assert_eq!(frame.page_id(), None);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.read_data()[10], 0);
    }
}
