//! Error types for Brindle.

use crate::page::PageId;
use thiserror::Error;

/// Result type alias using BrindleError.
pub type Result<T> = std::result::Result<T, BrindleError>;

/// Errors that can occur in Brindle operations.
#[derive(Debug, Error)]
pub enum BrindleError {
    // I/O and file layer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("file {file_id} is not open")]
    FileNotOpen { file_id: u32 },

    #[error("page {page_no} does not exist in file {file_id}")]
    PageNotFound { file_id: u32, page_no: u32 },

    // Buffer layer
    #[error("buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("page {page_id} is still pinned")]
    PagePinned { page_id: PageId },

    // Heap layer
    #[error("record of {size} bytes does not fit in a page (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    #[error("end of file reached")]
    EndOfFile,

    // Index layer
    #[error("index metadata mismatch: {0}")]
    BadIndexInfo(String),

    #[error("invalid scan operator pairing")]
    BadOpcodes,

    #[error("invalid scan range: low {low} exceeds high {high}")]
    BadScanRange { low: i32, high: i32 },

    #[error("no key found in the scan range")]
    NoSuchKeyFound,

    #[error("no scan in progress")]
    ScanNotInitialized,

    #[error("index scan completed")]
    IndexScanCompleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: BrindleError = io_err.into();
        assert!(matches!(err, BrindleError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_file_errors_display() {
        let err = BrindleError::FileNotFound("relA.0".to_string());
        assert_eq!(err.to_string(), "file not found: relA.0");

        let err = BrindleError::FileExists("relA.0".to_string());
        assert_eq!(err.to_string(), "file already exists: relA.0");

        let err = BrindleError::PageNotFound {
            file_id: 1,
            page_no: 42,
        };
        assert_eq!(err.to_string(), "page 42 does not exist in file 1");
    }

    #[test]
    fn test_page_pinned_display() {
        let err = BrindleError::PagePinned {
            page_id: PageId::new(2, 7),
        };
        assert_eq!(err.to_string(), "page 2:7 is still pinned");
    }

    #[test]
    fn test_scan_errors_display() {
        assert_eq!(
            BrindleError::BadOpcodes.to_string(),
            "invalid scan operator pairing"
        );
        assert_eq!(
            BrindleError::BadScanRange { low: 10, high: 5 }.to_string(),
            "invalid scan range: low 10 exceeds high 5"
        );
        assert_eq!(
            BrindleError::NoSuchKeyFound.to_string(),
            "no key found in the scan range"
        );
        assert_eq!(
            BrindleError::ScanNotInitialized.to_string(),
            "no scan in progress"
        );
        assert_eq!(
            BrindleError::IndexScanCompleted.to_string(),
            "index scan completed"
        );
    }

    #[test]
    fn test_bad_index_info_display() {
        let err = BrindleError::BadIndexInfo("attribute offset 4 != 0".to_string());
        assert_eq!(
            err.to_string(),
            "index metadata mismatch: attribute offset 4 != 0"
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(BrindleError::EndOfFile)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BrindleError>();
    }
}
