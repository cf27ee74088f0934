//! Key type tags and record identifiers.

use crate::page::PageNo;
use serde::{Deserialize, Serialize};

/// Type tag for the indexed attribute.
///
/// Stored in the index header page so a reopened index can verify it was
/// built over the same attribute type. Only `Int32` is implemented; the
/// other tags reserve header values for future key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum KeyType {
    /// 32-bit signed integer key.
    Int32 = 0,
    /// 64-bit floating point key (reserved, not implemented).
    Float64 = 1,
    /// Variable-length string key (reserved, not implemented).
    Varchar = 2,
}

impl KeyType {
    /// Returns the on-disk tag value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Decodes an on-disk tag value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(KeyType::Int32),
            1 => Some(KeyType::Float64),
            2 => Some(KeyType::Varchar),
            _ => None,
        }
    }
}

/// Identifier of a record in a heap relation.
///
/// Combines the heap page number with the slot index within that page.
/// The index stores these verbatim in its leaves; it never interprets
/// them beyond equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Heap page containing the record.
    pub page_no: PageNo,
    /// Slot number within the page.
    pub slot: u16,
}

impl RecordId {
    /// Size of a record identifier on disk (page_no: 4, slot: 2, pad: 2).
    pub const DISK_SIZE: usize = 8;

    /// Creates a new record ID.
    pub fn new(page_no: PageNo, slot: u16) -> Self {
        Self { page_no, slot }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot)
    }
}
