//! B+ tree index lifecycle and insertion engine.

use super::constants::{INTERNAL_FANOUT, LEAF_FANOUT};
use super::node::{InternalNode, LeafNode, MetaPage};
use super::scan::ScanState;
use crate::bufmgr::BufferManager;
use crate::heap::{HeapFile, HeapScan};
use std::sync::Arc;
use brindle_common::page::{FileId, PageNo};
use brindle_common::{BrindleError, KeyType, RecordId, Result};

/// A disk-resident B+ tree index over one integer attribute of a heap
/// relation.
///
/// The index lives in its own page file named
/// `"{relation_name}.{attr_byte_offset}"`. Opening a name that exists on
/// disk validates the stored metadata; opening a fresh name creates the
/// file and bulk-loads it from the relation. All page access goes through
/// the buffer manager, and every operation leaves the pool with no pinned
/// pages apart from an active scan's cursor.
pub struct BTreeIndex {
    /// Buffer manager all page I/O is routed through.
    bufmgr: Arc<BufferManager>,
    /// File ID of the open index file.
    file_id: FileId,
    /// Index file name, `"{relation_name}.{attr_byte_offset}"`.
    index_name: String,
    /// Byte offset of the key within each heap record.
    attr_byte_offset: usize,
    /// Current root page number, mirrored from the header page.
    root_page_no: PageNo,
    /// Active range scan, if any. Holds the cursor leaf pinned.
    pub(super) scan: Option<ScanState>,
}

impl BTreeIndex {
    /// Opens the index for `relation_name` keyed at `attr_byte_offset`,
    /// creating and bulk-loading it from the relation if the index file
    /// does not exist yet. Returns the index and its file name.
    ///
    /// An existing file whose stored relation name, attribute offset, or
    /// key type differ from the arguments fails with BadIndexInfo.
    pub fn open(
        bufmgr: Arc<BufferManager>,
        relation_name: &str,
        attr_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<(Self, String)> {
        let index_name = format!("{}.{}", relation_name, attr_byte_offset);

        match bufmgr.open_file(&index_name) {
            Ok(file_id) => {
                let index = Self::open_existing(
                    bufmgr,
                    file_id,
                    &index_name,
                    relation_name,
                    attr_byte_offset,
                    key_type,
                )?;
                Ok((index, index_name))
            }
            Err(BrindleError::FileNotFound(_)) => {
                let index = Self::create_and_load(
                    bufmgr,
                    &index_name,
                    relation_name,
                    attr_byte_offset,
                    key_type,
                )?;
                Ok((index, index_name))
            }
            Err(e) => Err(e),
        }
    }

    fn open_existing(
        bufmgr: Arc<BufferManager>,
        file_id: FileId,
        index_name: &str,
        relation_name: &str,
        attr_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<Self> {
        let header = bufmgr.read_page(file_id, MetaPage::PAGE_NO)?;
        let (stored_name, stored_offset, stored_tag, root_page_no) = header.read(|data| {
            (
                MetaPage::relation_name(data),
                MetaPage::attr_byte_offset(data),
                MetaPage::key_type_tag(data),
                MetaPage::root_page_no(data),
            )
        });
        drop(header);

        if stored_name != relation_name {
            return Err(BrindleError::BadIndexInfo(format!(
                "relation {:?} != expected {:?}",
                stored_name, relation_name
            )));
        }
        if stored_offset != attr_byte_offset as i32 {
            return Err(BrindleError::BadIndexInfo(format!(
                "attribute offset {} != expected {}",
                stored_offset, attr_byte_offset
            )));
        }
        if stored_tag != key_type.as_u32() {
            return Err(BrindleError::BadIndexInfo(format!(
                "key type tag {} != expected {}",
                stored_tag,
                key_type.as_u32()
            )));
        }

        Ok(Self {
            bufmgr,
            file_id,
            index_name: index_name.to_string(),
            attr_byte_offset,
            root_page_no,
            scan: None,
        })
    }

    fn create_and_load(
        bufmgr: Arc<BufferManager>,
        index_name: &str,
        relation_name: &str,
        attr_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<Self> {
        let file_id = bufmgr.create_file(index_name)?;

        // Header is page 1, the initial root page 2, its first leaf page 3.
        let (_, mut header) = bufmgr.alloc_page(file_id)?;
        let (root_page_no, mut root) = bufmgr.alloc_page(file_id)?;
        let (leaf_page_no, mut leaf) = bufmgr.alloc_page(file_id)?;

        root.write(|data| {
            InternalNode::init(data, 1);
            InternalNode::set_child(data, 0, leaf_page_no);
        });
        leaf.write(|data| LeafNode::init(data));
        header.write(|data| {
            MetaPage::init(
                data,
                relation_name,
                attr_byte_offset as i32,
                key_type,
                root_page_no,
            )
        });
        drop(header);
        drop(root);
        drop(leaf);

        let mut index = Self {
            bufmgr,
            file_id,
            index_name: index_name.to_string(),
            attr_byte_offset,
            root_page_no,
            scan: None,
        };
        index.bulk_load(relation_name)?;
        Ok(index)
    }

    /// Inserts every record of the relation, keyed at the attribute offset.
    fn bulk_load(&mut self, relation_name: &str) -> Result<()> {
        let heap = HeapFile::open(Arc::clone(&self.bufmgr), relation_name)?;
        let mut scan = HeapScan::new(&heap)?;

        loop {
            match scan.scan_next() {
                Ok((rid, record)) => {
                    let key = Self::extract_key(&record, self.attr_byte_offset)?;
                    self.insert_entry(key, rid)?;
                }
                Err(BrindleError::EndOfFile) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Reads the key from a record at the attribute offset.
    fn extract_key(record: &[u8], attr_byte_offset: usize) -> Result<i32> {
        let bytes = record
            .get(attr_byte_offset..attr_byte_offset + 4)
            .ok_or_else(|| {
                BrindleError::BadIndexInfo(format!(
                    "record of {} bytes is shorter than attribute offset {}",
                    record.len(),
                    attr_byte_offset
                ))
            })?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Returns the index file name.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub(super) fn bufmgr(&self) -> &Arc<BufferManager> {
        &self.bufmgr
    }

    pub(super) fn file_id(&self) -> FileId {
        self.file_id
    }

    pub(super) fn root_page_no(&self) -> PageNo {
        self.root_page_no
    }

    /// Inserts a `(key, rid)` entry. Duplicate keys are permitted and
    /// preserved.
    ///
    /// If the insertion splits the root, a replacement root is allocated
    /// and the header page's root pointer updated.
    pub fn insert_entry(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let push_up = self.insert_recursive(self.root_page_no, false, key, rid)?;

        if let Some((separator, new_right)) = push_up {
            let old_root = self.root_page_no;
            let (new_root_no, mut new_root) = self.bufmgr.alloc_page(self.file_id)?;
            new_root.write(|data| {
                InternalNode::init(data, 0);
                InternalNode::set_key(data, 0, separator);
                InternalNode::set_child(data, 0, old_root);
                InternalNode::set_child(data, 1, new_right);
            });
            drop(new_root);

            let mut header = self.bufmgr.read_page(self.file_id, MetaPage::PAGE_NO)?;
            header.write(|data| MetaPage::set_root_page_no(data, new_root_no));
            self.root_page_no = new_root_no;
        }

        Ok(())
    }

    /// Postorder recursive insert.
    ///
    /// Descends to the leaf for `key`, inserts, and propagates any split
    /// back up as `Some((separator, new_right_page))`. Each level's page
    /// stays pinned across the recursive call below it and is unpinned on
    /// return, dirty only when written.
    fn insert_recursive(
        &self,
        page_no: PageNo,
        is_leaf: bool,
        key: i32,
        rid: RecordId,
    ) -> Result<Option<(i32, PageNo)>> {
        let mut page = self.bufmgr.read_page(self.file_id, page_no)?;

        if is_leaf {
            if page.read(|data| LeafNode::num_keys(data)) < LEAF_FANOUT {
                page.write(|data| LeafNode::insert(data, key, rid));
                return Ok(None);
            }

            // Leaf split: move the upper half into a new sibling, then
            // place the pending entry on whichever side owns its range.
            let (sibling_no, mut sibling) = self.bufmgr.alloc_page(self.file_id)?;
            page.write(|left| {
                sibling.write(|right| LeafNode::split(left, right, sibling_no))
            });

            if sibling.read(|data| LeafNode::key(data, 0)) > key {
                page.write(|data| LeafNode::insert(data, key, rid));
            } else {
                sibling.write(|data| LeafNode::insert(data, key, rid));
            }

            // Copy-up: the separator is the right leaf's (possibly new)
            // first key, and it remains stored there.
            let separator = sibling.read(|data| LeafNode::key(data, 0));
            return Ok(Some((separator, sibling_no)));
        }

        let (child_no, child_is_leaf) = page.read(|data| {
            let slot = InternalNode::search_child(data, key);
            (InternalNode::child(data, slot), InternalNode::level(data) == 1)
        });

        let Some((separator, new_child)) = self.insert_recursive(child_no, child_is_leaf, key, rid)?
        else {
            return Ok(None);
        };

        if page.read(|data| InternalNode::num_keys(data)) < INTERNAL_FANOUT {
            page.write(|data| InternalNode::insert(data, separator, new_child));
            return Ok(None);
        }

        // Internal split: the middle key moves up and lives in neither
        // half; the incoming pair lands on the side its key belongs to.
        let (sibling_no, mut sibling) = self.bufmgr.alloc_page(self.file_id)?;
        let push_up = page.write(|left| sibling.write(|right| InternalNode::split(left, right)));

        if separator < push_up {
            page.write(|data| InternalNode::insert(data, separator, new_child));
        } else {
            sibling.write(|data| InternalNode::insert(data, separator, new_child));
        }

        Ok(Some((push_up, sibling_no)))
    }

    /// Flushes the index file. Fails with PagePinned while a scan holds
    /// its cursor.
    pub fn flush(&self) -> Result<()> {
        self.bufmgr.flush_file(self.file_id)
    }

    /// Closes the index: ends any active scan and flushes the file.
    pub fn close(mut self) -> Result<()> {
        self.scan = None;
        self.bufmgr.flush_file(self.file_id)
    }

    /// Destroys the index: ends any active scan and deletes the index
    /// file, discarding its buffered pages.
    pub fn destroy(mut self) -> Result<()> {
        self.scan = None;
        self.bufmgr.delete_file(self.file_id)
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        // Release the scan's cursor pin before flushing.
        self.scan = None;
        let _ = self.bufmgr.flush_file(self.file_id);
    }
}
