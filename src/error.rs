//! File layer errors.

use crate::page::PageNo;

/// File layer errors.
#[derive(Debug)]
pub enum FileError {
    /// Page not found in the file.
    ///
    /// Returned when reading, writing or disposing a page number that has
    /// never been allocated, or that has already been disposed.
    PageNotFound(PageNo),

    /// Invalid buffer size provided to read_page or write_page.
    ///
    /// Buffers must be exactly PAGE_SIZE bytes.
    InvalidBufferSize {
        /// Expected buffer size (PAGE_SIZE)
        expected: usize,
        /// Actual buffer size provided
        actual: usize,
    },

    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// Data corruption detected.
    ///
    /// Indicates that the backing file has an invalid format or size.
    Corrupted(String),
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileError::PageNotFound(page_no) => write!(f, "page not found: {:?}", page_no),
            FileError::InvalidBufferSize { expected, actual } => {
                write!(f, "invalid buffer size: expected {}, got {}", expected, actual)
            }
            FileError::Io(e) => write!(f, "I/O error: {}", e),
            FileError::Corrupted(msg) => write!(f, "data corruption: {}", msg),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> Self {
        FileError::Io(e)
    }
}
