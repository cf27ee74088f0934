//! Heap relation storage.
//!
//! This module provides append-only heap files of variable-length records
//! with:
//! - HeapPage: slotted page format for record storage
//! - HeapFile: file-level insert API over the buffer manager
//! - HeapScan: sequential scanner yielding (RecordId, record bytes)

mod file;
mod page;

pub use file::{HeapFile, HeapScan};
pub use page::HeapPage;
