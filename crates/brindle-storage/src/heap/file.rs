//! Heap file and sequential scanner.
//!
//! A heap file is an append-only sequence of slotted record pages. All
//! page access goes through the buffer manager; records are identified by
//! (page number, slot) pairs that the index stores verbatim.

use crate::bufmgr::BufferManager;
use crate::heap::page::HeapPage;
use bytes::Bytes;
use std::sync::Arc;
use brindle_common::page::{FileId, PageNo};
use brindle_common::{BrindleError, RecordId, Result};

/// An append-only heap relation of variable-length records.
pub struct HeapFile {
    /// Buffer manager all page I/O is routed through.
    bufmgr: Arc<BufferManager>,
    /// File ID assigned at open/create time.
    file_id: FileId,
    /// Relation name the file was opened under.
    name: String,
}

impl HeapFile {
    /// Creates a new empty heap relation.
    pub fn create(bufmgr: Arc<BufferManager>, name: &str) -> Result<Self> {
        let file_id = bufmgr.create_file(name)?;
        Ok(Self {
            bufmgr,
            file_id,
            name: name.to_string(),
        })
    }

    /// Opens an existing heap relation.
    pub fn open(bufmgr: Arc<BufferManager>, name: &str) -> Result<Self> {
        let file_id = bufmgr.open_file(name)?;
        Ok(Self {
            bufmgr,
            file_id,
            name: name.to_string(),
        })
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying file ID.
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Appends a record, returning its identifier.
    ///
    /// Inserts into the last page when it has room; otherwise a fresh page
    /// is allocated.
    pub fn insert_record(&self, record: &[u8]) -> Result<RecordId> {
        if record.len() > HeapPage::MAX_RECORD_SIZE {
            return Err(BrindleError::RecordTooLarge {
                size: record.len(),
                max: HeapPage::MAX_RECORD_SIZE,
            });
        }

        let num_pages = self.bufmgr.num_pages(self.file_id)?;
        if num_pages > 0 {
            let mut page = self.bufmgr.read_page(self.file_id, num_pages)?;
            if let Some(slot) = page.write(|data| HeapPage::try_insert(data, record)) {
                return Ok(RecordId::new(num_pages, slot));
            }
        }

        let (page_no, mut page) = self.bufmgr.alloc_page(self.file_id)?;
        let slot = page.write(|data| {
            HeapPage::init(data);
            HeapPage::try_insert(data, record)
        });
        // A record within MAX_RECORD_SIZE always fits in a fresh page.
        let slot = slot.ok_or(BrindleError::RecordTooLarge {
            size: record.len(),
            max: HeapPage::MAX_RECORD_SIZE,
        })?;
        Ok(RecordId::new(page_no, slot))
    }

    /// Flushes the relation's dirty pages to disk.
    pub fn flush(&self) -> Result<()> {
        self.bufmgr.flush_file(self.file_id)
    }
}

/// Sequential scanner over a heap relation.
///
/// Yields records in (page, slot) order. Past the final record,
/// `scan_next` fails with EndOfFile; callers use that as the loop
/// terminator.
pub struct HeapScan {
    bufmgr: Arc<BufferManager>,
    file_id: FileId,
    /// Total pages at scan start; records appended later are not seen.
    num_pages: u32,
    /// Next page to read (1-based).
    current_page: PageNo,
    /// Next slot to return within the current page.
    current_slot: u16,
}

impl HeapScan {
    /// Starts a scan positioned before the first record.
    pub fn new(heap: &HeapFile) -> Result<Self> {
        let num_pages = heap.bufmgr.num_pages(heap.file_id)?;
        Ok(Self {
            bufmgr: Arc::clone(&heap.bufmgr),
            file_id: heap.file_id,
            num_pages,
            current_page: 1,
            current_slot: 0,
        })
    }

    /// Returns the next record and its identifier.
    ///
    /// Fails with EndOfFile when the relation is exhausted.
    pub fn scan_next(&mut self) -> Result<(RecordId, Bytes)> {
        while self.current_page <= self.num_pages {
            let page = self.bufmgr.read_page(self.file_id, self.current_page)?;
            let record = page.read(|data| {
                HeapPage::record(data, self.current_slot).map(Bytes::copy_from_slice)
            });

            match record {
                Some(bytes) => {
                    let rid = RecordId::new(self.current_page, self.current_slot);
                    self.current_slot += 1;
                    return Ok((rid, bytes));
                }
                None => {
                    // Page exhausted; move to the next one.
                    self.current_page += 1;
                    self.current_slot = 0;
                }
            }
        }

        Err(BrindleError::EndOfFile)
    }
}
