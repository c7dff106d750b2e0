//! Disk-backed paged file implementation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::PageFile;
use crate::error::FileError;
use crate::page::{PAGE_SIZE, PageNo};

/// Disk-backed paged file.
///
/// Pages are stored as contiguous 8KB blocks in a single file.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (8KB)     | Page 1 (8KB)     | Page 2 (8KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 8192      ^ offset 16384
/// ```
///
/// Disposed page numbers are kept on an in-memory free list and handed
/// out again by `allocate_page`, so the file only grows when the free
/// list is empty. The free list is not persisted; reopening a file
/// treats every page in it as live.
///
/// # Concurrency
///
/// A mutex around the file handle serializes all I/O.
///
/// # Durability
///
/// Writes reach the OS cache; call `sync_all()` to force them to disk.
pub struct DiskFile {
    path: PathBuf,
    state: Mutex<DiskFileState>,
}

struct DiskFileState {
    file: File,
    page_count: u64,
    free: Vec<PageNo>,
}

impl DiskFile {
    /// Opens or creates a paged file at the given path.
    ///
    /// If the file exists, its page count is derived from the file size.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Corrupted` if the file size is not a multiple
    /// of PAGE_SIZE.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(FileError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            state: Mutex::new(DiskFileState {
                file,
                page_count: file_size / PAGE_SIZE as u64,
                free: Vec::new(),
            }),
        })
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of live (allocated, not disposed) pages.
    pub fn page_count(&self) -> u64 {
        let state = self.state.lock();
        state.page_count - state.free.len() as u64
    }

    /// Syncs all pending writes to physical disk (fsync).
    pub fn sync_all(&self) -> Result<(), FileError> {
        let state = self.state.lock();
        state.file.sync_all()?;
        Ok(())
    }
}

impl DiskFileState {
    fn check_live(&self, page_no: PageNo) -> Result<(), FileError> {
        if page_no.number() >= self.page_count || self.free.contains(&page_no) {
            return Err(FileError::PageNotFound(page_no));
        }
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn read_page(&self, page_no: PageNo, buf: &mut [u8]) -> Result<(), FileError> {
        if buf.len() != PAGE_SIZE {
            return Err(FileError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut state = self.state.lock();
        state.check_live(page_no)?;

        state.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        state.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_no: PageNo, buf: &[u8]) -> Result<(), FileError> {
        if buf.len() != PAGE_SIZE {
            return Err(FileError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let mut state = self.state.lock();
        state.check_live(page_no)?;

        state.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        state.file.write_all(buf)?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageNo, FileError> {
        let mut state = self.state.lock();

        let page_no = match state.free.pop() {
            Some(page_no) => page_no,
            None => {
                let page_no = PageNo::new(state.page_count);
                state.page_count += 1;
                page_no
            }
        };

        // Fresh and reused pages alike must read back as zeros.
        state.file.seek(SeekFrom::Start(page_no.byte_offset()))?;
        state.file.write_all(&[0u8; PAGE_SIZE])?;

        Ok(page_no)
    }

    fn dispose_page(&self, page_no: PageNo) -> Result<(), FileError> {
        let mut state = self.state.lock();
        state.check_live(page_no)?;
        state.free.push(page_no);
        Ok(())
    }
}
