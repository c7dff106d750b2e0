//! Paged file backends.
//!
//! This module provides the `PageFile` trait for page-granular I/O on one
//! file of durable storage, along with `MemoryFile` and `DiskFile`
//! implementations, and the `FileRef` handle the buffer layer caches
//! pages under.

mod file;
mod memory;

pub use file::DiskFile;
pub use memory::MemoryFile;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::FileError;
use crate::page::PageNo;

/// One file of page-granular durable storage.
///
/// All I/O is page-sized and uses caller-owned buffers; the file itself
/// never caches. Page numbers are allocated by the file and may be reused
/// after `dispose_page`, so a page number only names live storage between
/// an allocate and the matching dispose.
///
/// # Design Decisions
///
/// 1. **Synchronous I/O**: every operation blocks until the backend has
///    accepted the read or write. Callers that need overlapping I/O layer
///    it above this trait.
///
/// 2. **Caller-owned buffers**: the file reads into and writes from exactly
///    `PAGE_SIZE`-byte slices owned by the caller (the buffer manager's
///    frame pool, typically).
///
/// 3. **Explicit allocation**: `allocate_page()` reserves a page number and
///    backing space; `dispose_page()` returns the number for reuse.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync); operations take
/// `&self` and serialize internally as needed.
pub trait PageFile: Send + Sync {
    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `FileError::PageNotFound` if the page is not live.
    /// Returns `FileError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn read_page(&self, page_no: PageNo, buf: &mut [u8]) -> Result<(), FileError>;

    /// Writes a page from a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `FileError::PageNotFound` if the page is not live.
    /// Returns `FileError::InvalidBufferSize` if `buf.len() != PAGE_SIZE`.
    fn write_page(&self, page_no: PageNo, buf: &[u8]) -> Result<(), FileError>;

    /// Reserves a new page number and its backing space.
    ///
    /// The new page reads back as zeros. Page numbers disposed earlier may
    /// be handed out again.
    fn allocate_page(&self) -> Result<PageNo, FileError>;

    /// Retires a page number, releasing it for reuse.
    ///
    /// # Errors
    ///
    /// Returns `FileError::PageNotFound` if the page is not live.
    fn dispose_page(&self, page_no: PageNo) -> Result<(), FileError>;
}

/// Shared handle to a [`PageFile`].
///
/// The buffer layer keys its cache on the *handle*, not on the underlying
/// storage: two `FileRef`s are equal only when they are clones of the same
/// handle, so two separately opened handles to the same path are cached
/// independently.
pub struct FileRef<F>(Arc<F>);

impl<F> FileRef<F> {
    /// Wraps a file in a shared handle.
    pub fn new(file: F) -> Self {
        Self(Arc::new(file))
    }
}

impl<F> Clone for FileRef<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F> std::ops::Deref for FileRef<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F> PartialEq for FileRef<F> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<F> Eq for FileRef<F> {}

impl<F> Hash for FileRef<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl<F> std::fmt::Debug for FileRef<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileRef({:p})", Arc::as_ptr(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_ref_identity() {
        let a = FileRef::new(MemoryFile::new());
        let b = FileRef::new(MemoryFile::new());
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_ref_hash_follows_identity() {
        use std::collections::HashSet;

        let a = FileRef::new(MemoryFile::new());
        let b = FileRef::new(MemoryFile::new());

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&a));
        assert!(!set.contains(&b));
    }
}
