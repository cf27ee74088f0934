//! Buffer manager facade.
//!
//! Composes the file manager and the buffer pool into the page interface
//! the heap and index layers consume: allocate a page (returned pinned),
//! read a page (pinned), flush a file, delete a file. A page handed out is
//! represented by a [`PinnedPage`] guard; dropping the guard performs the
//! matching unpin, with the dirty flag set iff the holder wrote through it.
//! The guard makes the discipline structural: every control path, error
//! paths included, unpins each page exactly once.

use crate::files::FileManager;
use std::sync::Arc;
use brindle_buffer::{BufferPool, BufferPoolStats, EvictedPage, FrameId};
use brindle_common::page::{FileId, PageId, PageNo, PAGE_SIZE};
use brindle_common::{Result, StorageConfig};

/// Buffer manager over named page files.
pub struct BufferManager {
    /// File manager for disk I/O.
    files: FileManager,
    /// Buffer pool for page caching.
    pool: Arc<BufferPool>,
}

impl BufferManager {
    /// Creates a buffer manager from storage configuration.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let pool = Arc::new(BufferPool::new(config.buffer_pool_frames));
        let files = FileManager::new(config)?;
        Ok(Self { files, pool })
    }

    /// Creates a new page file. Fails with FileExists if present on disk.
    pub fn create_file(&self, name: &str) -> Result<FileId> {
        self.files.create_file(name)
    }

    /// Opens an existing page file. Fails with FileNotFound if absent.
    pub fn open_file(&self, name: &str) -> Result<FileId> {
        self.files.open_file(name)
    }

    /// Returns true if a file with this name exists on disk.
    pub fn file_exists(&self, name: &str) -> bool {
        self.files.file_exists(name)
    }

    /// Returns the number of pages in an open file.
    pub fn num_pages(&self, file_id: FileId) -> Result<u32> {
        self.files.num_pages(file_id)
    }

    /// Writes an evicted dirty page back to disk.
    fn write_back(&self, evicted: Option<EvictedPage>) -> Result<()> {
        if let Some(page) = evicted {
            self.files.write_page(page.page_id, &page.data)?;
        }
        Ok(())
    }

    /// Allocates a fresh zeroed page at the end of the file.
    ///
    /// Returns the new page number and the page itself, pinned.
    pub fn alloc_page(&self, file_id: FileId) -> Result<(PageNo, PinnedPage)> {
        let page_no = self.files.allocate_page(file_id)?;
        let page_id = PageId::new(file_id, page_no);

        let (frame_id, evicted) = self.pool.new_page(page_id)?;
        self.write_back(evicted)?;

        Ok((page_no, PinnedPage::new(Arc::clone(&self.pool), page_id, frame_id)))
    }

    /// Reads a page, pinning it for the lifetime of the returned guard.
    ///
    /// Resident pages are served from the pool; otherwise the page is read
    /// from disk, displacing an unpinned page if the pool is full.
    pub fn read_page(&self, file_id: FileId, page_no: PageNo) -> Result<PinnedPage> {
        let page_id = PageId::new(file_id, page_no);

        if let Some(frame_id) = self.pool.fetch_page(page_id) {
            return Ok(PinnedPage::new(Arc::clone(&self.pool), page_id, frame_id));
        }

        let data = self.files.read_page(page_id)?;
        let (frame_id, evicted) = self.pool.load_page(page_id, &data)?;
        self.write_back(evicted)?;

        Ok(PinnedPage::new(Arc::clone(&self.pool), page_id, frame_id))
    }

    /// Flushes all dirty pages of a file to disk.
    ///
    /// Fails with PagePinned if any page of the file is still pinned: an
    /// operation in flight (or a leaked guard) holds it.
    pub fn flush_file(&self, file_id: FileId) -> Result<()> {
        self.pool
            .flush_file(file_id, |page_id, data| self.files.write_page(page_id, data))?;
        self.files.sync_file(file_id)
    }

    /// Closes a file, flushing its dirty pages first.
    pub fn close_file(&self, file_id: FileId) -> Result<()> {
        self.flush_file(file_id)?;
        self.pool.evict_file(file_id)?;
        self.files.close_file(file_id)
    }

    /// Deletes a file, discarding its resident pages without write-back.
    ///
    /// Fails with PagePinned if any page of the file is still pinned.
    pub fn delete_file(&self, file_id: FileId) -> Result<()> {
        self.pool.evict_file(file_id)?;
        self.files.delete_file(file_id)
    }

    /// Returns buffer pool statistics.
    ///
    /// `pinned_frames == 0` at rest is the discipline invariant the tests
    /// assert after every index operation.
    pub fn stats(&self) -> BufferPoolStats {
        self.pool.stats()
    }
}

/// An owning pin on a buffered page.
///
/// Page contents are accessed through closures so the underlying frame
/// lock is held only for the duration of the access, while the pin itself
/// lasts until the guard is dropped. A range scan stores one of these as
/// its cursor, keeping the current leaf pinned between calls.
pub struct PinnedPage {
    pool: Arc<BufferPool>,
    page_id: PageId,
    frame_id: FrameId,
    dirty: bool,
}

impl PinnedPage {
    fn new(pool: Arc<BufferPool>, page_id: PageId, frame_id: FrameId) -> Self {
        Self {
            pool,
            page_id,
            frame_id,
            dirty: false,
        }
    }

    /// Returns the page's identity.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the page number within its file.
    pub fn page_no(&self) -> PageNo {
        self.page_id.page_no
    }

    /// Reads the page contents.
    pub fn read<R>(&self, f: impl FnOnce(&[u8; PAGE_SIZE]) -> R) -> R {
        let frame = self.pool.frame(self.frame_id);
        let data = frame.read_data();
        f(&**data)
    }

    /// Mutates the page contents, marking the page dirty.
    pub fn write<R>(&mut self, f: impl FnOnce(&mut [u8; PAGE_SIZE]) -> R) -> R {
        self.dirty = true;
        let frame = self.pool.frame(self.frame_id);
        let mut data = frame.write_data();
        f(&mut **data)
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}
