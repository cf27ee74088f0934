//! File manager for page-level I/O over named files.
//!
//! Files are addressed by name within the data directory and receive a
//! numeric FileId when opened or created. Pages within a file are numbered
//! densely starting at 1; page number 0 is reserved to mean "no page".

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use brindle_common::page::{FileId, PageId, PageNo, PAGE_SIZE};
use brindle_common::{BrindleError, Result, StorageConfig};

/// Handle for an open data file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Name the file was opened under.
    name: String,
    /// Number of pages in the file.
    num_pages: u32,
}

/// Registry of open files.
#[derive(Default)]
struct FileRegistry {
    /// Open file handles keyed by file ID.
    handles: HashMap<FileId, FileHandle>,
    /// File name to file ID for files currently open.
    by_name: HashMap<String, FileId>,
    /// Next file ID to assign.
    next_id: FileId,
}

/// Manages reading and writing pages in named disk files.
pub struct FileManager {
    /// Configuration (data directory, fsync policy).
    config: StorageConfig,
    /// Open file registry.
    registry: Mutex<FileRegistry>,
}

impl FileManager {
    /// Creates a new file manager, creating the data directory if needed.
    pub fn new(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            registry: Mutex::new(FileRegistry::default()),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the on-disk path for a file name.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    /// Returns true if a file with this name exists on disk.
    pub fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    fn register(&self, file: File, name: &str, num_pages: u32) -> FileId {
        let mut registry = self.registry.lock();
        let file_id = registry.next_id;
        registry.next_id += 1;
        registry.handles.insert(
            file_id,
            FileHandle {
                file,
                name: name.to_string(),
                num_pages,
            },
        );
        registry.by_name.insert(name.to_string(), file_id);
        file_id
    }

    /// Creates a new empty file.
    ///
    /// Fails with FileExists if a file with this name is already on disk.
    pub fn create_file(&self, name: &str) -> Result<FileId> {
        let path = self.file_path(name);
        if path.exists() {
            return Err(BrindleError::FileExists(name.to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        Ok(self.register(file, name, 0))
    }

    /// Opens an existing file.
    ///
    /// Fails with FileNotFound if no file with this name is on disk.
    /// Opening a name that is already open returns the existing FileId.
    pub fn open_file(&self, name: &str) -> Result<FileId> {
        if let Some(&file_id) = self.registry.lock().by_name.get(name) {
            return Ok(file_id);
        }

        let path = self.file_path(name);
        if !path.exists() {
            return Err(BrindleError::FileNotFound(name.to_string()));
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(self.register(file, name, num_pages))
    }

    /// Returns the number of pages in an open file.
    pub fn num_pages(&self, file_id: FileId) -> Result<u32> {
        let registry = self.registry.lock();
        let handle = registry
            .handles
            .get(&file_id)
            .ok_or(BrindleError::FileNotOpen { file_id })?;
        Ok(handle.num_pages)
    }

    /// Allocates a new page at the end of the file.
    ///
    /// The page is written as zeroes to extend the file; its 1-based page
    /// number is returned.
    pub fn allocate_page(&self, file_id: FileId) -> Result<PageNo> {
        let mut registry = self.registry.lock();
        let handle = registry
            .handles
            .get_mut(&file_id)
            .ok_or(BrindleError::FileNotOpen { file_id })?;

        let page_no = handle.num_pages + 1;
        let offset = (page_no as u64 - 1) * PAGE_SIZE as u64;
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        handle.num_pages = page_no;
        Ok(page_no)
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        let mut registry = self.registry.lock();
        let handle = registry
            .handles
            .get_mut(&page_id.file_id)
            .ok_or(BrindleError::FileNotOpen {
                file_id: page_id.file_id,
            })?;

        if page_id.page_no == 0 || page_id.page_no > handle.num_pages {
            return Err(BrindleError::PageNotFound {
                file_id: page_id.file_id,
                page_no: page_id.page_no,
            });
        }

        let offset = (page_id.page_no as u64 - 1) * PAGE_SIZE as u64;
        handle.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        handle.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut registry = self.registry.lock();
        let handle = registry
            .handles
            .get_mut(&page_id.file_id)
            .ok_or(BrindleError::FileNotOpen {
                file_id: page_id.file_id,
            })?;

        if page_id.page_no == 0 || page_id.page_no > handle.num_pages {
            return Err(BrindleError::PageNotFound {
                file_id: page_id.file_id,
                page_no: page_id.page_no,
            });
        }

        let offset = (page_id.page_no as u64 - 1) * PAGE_SIZE as u64;
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(data)?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        Ok(())
    }

    /// Syncs an open file's contents to disk.
    pub fn sync_file(&self, file_id: FileId) -> Result<()> {
        let registry = self.registry.lock();
        let handle = registry
            .handles
            .get(&file_id)
            .ok_or(BrindleError::FileNotOpen { file_id })?;
        handle.file.sync_all()?;
        Ok(())
    }

    /// Closes an open file without deleting it.
    pub fn close_file(&self, file_id: FileId) -> Result<()> {
        let mut registry = self.registry.lock();
        if let Some(handle) = registry.handles.remove(&file_id) {
            registry.by_name.remove(&handle.name);
            handle.file.sync_all()?;
        }
        Ok(())
    }

    /// Deletes a file, closing it first if open.
    pub fn delete_file(&self, file_id: FileId) -> Result<()> {
        let name = {
            let mut registry = self.registry.lock();
            match registry.handles.remove(&file_id) {
                Some(handle) => {
                    registry.by_name.remove(&handle.name);
                    handle.name
                }
                None => return Err(BrindleError::FileNotOpen { file_id }),
            }
        };

        let path = self.file_path(&name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Closes all open files.
    pub fn close_all(&self) -> Result<()> {
        let mut registry = self.registry.lock();
        registry.by_name.clear();
        for (_, handle) in registry.handles.drain() {
            handle.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        let _ = self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_file_manager() -> (FileManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            buffer_pool_frames: 16,
            fsync_enabled: false,
        };
        let fm = FileManager::new(config).unwrap();
        (fm, dir)
    }

    #[test]
    fn test_file_manager_new() {
        let (fm, _dir) = create_test_file_manager();
        assert!(fm.data_dir().exists());
    }

    #[test]
    fn test_create_and_open_file() {
        let (fm, _dir) = create_test_file_manager();

        let id = fm.create_file("relA.0").unwrap();
        assert_eq!(fm.num_pages(id).unwrap(), 0);
        assert!(fm.file_exists("relA.0"));

        // Reopening the same name yields the same handle.
        let id2 = fm.open_file("relA.0").unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_create_existing_file_fails() {
        let (fm, _dir) = create_test_file_manager();

        fm.create_file("relA.0").unwrap();
        let result = fm.create_file("relA.0");
        assert!(matches!(result, Err(BrindleError::FileExists(name)) if name == "relA.0"));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let (fm, _dir) = create_test_file_manager();

        let result = fm.open_file("nope.4");
        assert!(matches!(result, Err(BrindleError::FileNotFound(name)) if name == "nope.4"));
    }

    #[test]
    fn test_allocate_pages_one_based() {
        let (fm, _dir) = create_test_file_manager();
        let id = fm.create_file("f").unwrap();

        assert_eq!(fm.allocate_page(id).unwrap(), 1);
        assert_eq!(fm.allocate_page(id).unwrap(), 2);
        assert_eq!(fm.allocate_page(id).unwrap(), 3);
        assert_eq!(fm.num_pages(id).unwrap(), 3);
    }

    #[test]
    fn test_write_read_page() {
        let (fm, _dir) = create_test_file_manager();
        let id = fm.create_file("f").unwrap();
        let page_no = fm.allocate_page(id).unwrap();
        let page_id = PageId::new(id, page_no);

        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xAB;
        data[PAGE_SIZE - 1] = 0xEF;
        fm.write_page(page_id, &data).unwrap();

        let read_back = fm.read_page(page_id).unwrap();
        assert_eq!(read_back[0], 0xAB);
        assert_eq!(read_back[PAGE_SIZE - 1], 0xEF);
    }

    #[test]
    fn test_read_invalid_page_fails() {
        let (fm, _dir) = create_test_file_manager();
        let id = fm.create_file("f").unwrap();
        fm.allocate_page(id).unwrap();

        // Page 0 is reserved
        assert!(matches!(
            fm.read_page(PageId::new(id, 0)),
            Err(BrindleError::PageNotFound { .. })
        ));
        // Past the end of the file
        assert!(matches!(
            fm.read_page(PageId::new(id, 99)),
            Err(BrindleError::PageNotFound { .. })
        ));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            buffer_pool_frames: 16,
            fsync_enabled: true,
        };

        let page_no;
        {
            let fm = FileManager::new(config.clone()).unwrap();
            let id = fm.create_file("persist").unwrap();
            page_no = fm.allocate_page(id).unwrap();

            let mut data = [0u8; PAGE_SIZE];
            data[7] = 0x77;
            fm.write_page(PageId::new(id, page_no), &data).unwrap();
        }

        {
            let fm = FileManager::new(config).unwrap();
            let id = fm.open_file("persist").unwrap();
            assert_eq!(fm.num_pages(id).unwrap(), 1);
            let data = fm.read_page(PageId::new(id, page_no)).unwrap();
            assert_eq!(data[7], 0x77);
        }
    }

    #[test]
    fn test_delete_file() {
        let (fm, _dir) = create_test_file_manager();
        let id = fm.create_file("gone.2").unwrap();
        fm.allocate_page(id).unwrap();
        assert!(fm.file_exists("gone.2"));

        fm.delete_file(id).unwrap();
        assert!(!fm.file_exists("gone.2"));

        // The name can be created afresh.
        fm.create_file("gone.2").unwrap();
    }

    #[test]
    fn test_close_then_reopen() {
        let (fm, _dir) = create_test_file_manager();
        let id = fm.create_file("f").unwrap();
        fm.allocate_page(id).unwrap();
        fm.close_file(id).unwrap();

        // Operations on the closed handle fail.
        assert!(matches!(
            fm.num_pages(id),
            Err(BrindleError::FileNotOpen { .. })
        ));

        // Reopening by name assigns a fresh handle and sees the page.
        let id2 = fm.open_file("f").unwrap();
        assert_eq!(fm.num_pages(id2).unwrap(), 1);
    }
}
