//! Page identifiers for Brindle storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (8 KB).
pub const PAGE_SIZE: usize = 8 * 1024;

/// Identifier for an open file, assigned by the file manager.
pub type FileId = u32;

/// Page number within a file. Pages are numbered densely starting at 1.
pub type PageNo = u32;

/// Reserved page number meaning "no page". Child pointers and sibling
/// links use this to mark empty slots and chain ends.
pub const INVALID_PAGE_NO: PageNo = 0;

/// Unique identifier for a page across all open files.
///
/// Combines the file manager's file ID with the 1-based page number
/// within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    /// File identifier assigned at open/create time.
    pub file_id: FileId,
    /// Page number within the file (1-indexed; 0 is reserved).
    pub page_no: PageNo,
}

impl PageId {
    /// Creates a new PageId.
    pub fn new(file_id: FileId, page_no: PageNo) -> Self {
        Self { file_id, page_no }
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_id, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_constant() {
        assert_eq!(PAGE_SIZE, 8 * 1024);
        assert_eq!(PAGE_SIZE, 8192);
    }

    #[test]
    fn test_page_id_new() {
        let page_id = PageId::new(1, 100);
        assert_eq!(page_id.file_id, 1);
        assert_eq!(page_id.page_no, 100);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(PageId::new(5, 123).to_string(), "5:123");
        assert_eq!(PageId::new(0, 1).to_string(), "0:1");
    }

    #[test]
    fn test_page_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(PageId::new(1, 1));
        set.insert(PageId::new(1, 2));
        set.insert(PageId::new(1, 1)); // Duplicate

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_invalid_page_no() {
        assert_eq!(INVALID_PAGE_NO, 0);
    }

    #[test]
    fn test_page_id_serde_roundtrip() {
        let original = PageId::new(10, 500);
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: PageId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
