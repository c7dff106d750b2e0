//! Buffer manager errors.

use super::frame::FrameId;
use super::index::IndexError;
use crate::error::FileError;

/// Buffer manager errors.
///
/// This error type wraps file- and index-level errors and adds the buffer
/// manager's own failure conditions.
#[derive(Debug)]
pub enum BufferError {
    /// No frame can be reused because every frame is pinned.
    ///
    /// Either the pool is too small for the working set, or pages are not
    /// being unpinned after use.
    OutOfFrames,

    /// Underlying file read/write/allocate/dispose failed.
    Io(FileError),

    /// The page index reported a structural failure.
    ///
    /// Distinct from an ordinary cache miss: a miss on fetch loads the
    /// page, a miss on unpin is `PageNotFound`, while this variant means
    /// the index itself could not be trusted.
    Index(IndexError),

    /// The page is not in the buffer pool.
    PageNotFound,

    /// Unpin was requested for a page whose pin count is already zero.
    PageNotPinned,

    /// The operation requires the page (or file) to have no active pins.
    PagePinned,

    /// A descriptor names a file without holding a live page.
    ///
    /// This indicates an internal bookkeeping bug and is surfaced rather
    /// than skipped.
    InconsistentBuffer {
        /// The frame whose descriptor is inconsistent.
        frame_id: FrameId,
    },
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::OutOfFrames => {
                write!(f, "buffer pool exhausted: all frames are pinned")
            }
            BufferError::Io(e) => write!(f, "file error: {}", e),
            BufferError::Index(e) => write!(f, "page index error: {}", e),
            BufferError::PageNotFound => write!(f, "page is not in the buffer pool"),
            BufferError::PageNotPinned => write!(f, "page is not pinned"),
            BufferError::PagePinned => write!(f, "page is pinned"),
            BufferError::InconsistentBuffer { frame_id } => {
                write!(f, "inconsistent buffer state in frame {}", frame_id.index())
            }
        }
    }
}

impl std::error::Error for BufferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BufferError::Io(e) => Some(e),
            BufferError::Index(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FileError> for BufferError {
    fn from(e: FileError) -> Self {
        BufferError::Io(e)
    }
}

impl From<IndexError> for BufferError {
    fn from(e: IndexError) -> Self {
        BufferError::Index(e)
    }
}
