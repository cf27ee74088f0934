//! Configuration structures for Brindle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the file manager and buffer pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for data and index files.
    pub data_dir: PathBuf,
    /// Buffer pool size in number of frames.
    pub buffer_pool_frames: usize,
    /// Enable fsync after page writes.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            buffer_pool_frames: 1024, // 8 MB with 8 KB pages
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Returns the total buffer pool size in bytes.
    pub fn buffer_pool_size_bytes(&self) -> usize {
        self.buffer_pool_frames * crate::page::PAGE_SIZE
    }
}
