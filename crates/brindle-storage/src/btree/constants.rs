//! Layout constants for B+ tree node pages.

use brindle_common::page::{PageNo, PAGE_SIZE};
use brindle_common::RecordId;

/// Sentinel stored in unused key slots. Keys in a node are sorted
/// ascending, so live keys form a prefix and the sentinel marks the rest.
pub const KEY_SENTINEL: i32 = i32::MAX;

/// Page number of the index metadata header.
pub(crate) const HEADER_PAGE_NO: PageNo = 1;

/// Fixed length of the relation name field in the header page.
pub(crate) const RELATION_NAME_LEN: usize = 20;

pub(crate) const KEY_SIZE: usize = std::mem::size_of::<i32>();
pub(crate) const PAGE_NO_SIZE: usize = std::mem::size_of::<PageNo>();
pub(crate) const LEVEL_SIZE: usize = 4;
pub(crate) const RID_SIZE: usize = RecordId::DISK_SIZE;

/// Maximum keys in an internal node. The node holds `level`, N keys, and
/// N+1 child pointers within one page.
pub const INTERNAL_FANOUT: usize =
    (PAGE_SIZE - LEVEL_SIZE - PAGE_NO_SIZE) / (KEY_SIZE + PAGE_NO_SIZE);

/// Maximum entries in a leaf node. The node holds L keys, L RIDs, and the
/// right-sibling pointer within one page.
pub const LEAF_FANOUT: usize = (PAGE_SIZE - PAGE_NO_SIZE) / (KEY_SIZE + RID_SIZE);

// Internal page field offsets.
pub(crate) const INTERNAL_KEYS_OFFSET: usize = LEVEL_SIZE;
pub(crate) const INTERNAL_CHILDREN_OFFSET: usize =
    INTERNAL_KEYS_OFFSET + INTERNAL_FANOUT * KEY_SIZE;

// Leaf page field offsets.
pub(crate) const LEAF_KEYS_OFFSET: usize = 0;
pub(crate) const LEAF_RIDS_OFFSET: usize = LEAF_KEYS_OFFSET + LEAF_FANOUT * KEY_SIZE;
pub(crate) const LEAF_SIB_OFFSET: usize = LEAF_RIDS_OFFSET + LEAF_FANOUT * RID_SIZE;
