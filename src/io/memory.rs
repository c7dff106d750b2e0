//! In-memory paged file implementation.

use parking_lot::Mutex;

use super::PageFile;
use crate::error::FileError;
use crate::page::{PAGE_SIZE, PageData, PageNo};

/// In-memory paged file for testing and development.
///
/// Pages live in a Vec of slots indexed by page number. Disposed pages
/// leave an empty slot behind and their numbers are reallocated
/// last-disposed-first.
pub struct MemoryFile {
    state: Mutex<MemoryFileState>,
}

struct MemoryFileState {
    pages: Vec<Option<PageData>>,
    free: Vec<PageNo>,
}

impl MemoryFile {
    /// Creates a new empty in-memory file.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryFileState {
                pages: Vec::new(),
                free: Vec::new(),
            }),
        }
    }

    /// Returns the number of live (allocated, not disposed) pages.
    pub fn page_count(&self) -> usize {
        let state = self.state.lock();
        state.pages.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for MemoryFile {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFile for MemoryFile {
    fn read_page(&self, page_no: PageNo, buf: &mut [u8]) -> Result<(), FileError> {
        if buf.len() != PAGE_SIZE {
            return Err(FileError::InvalidBufferSize {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }

        let state = self.state.lock();
        let page = state
            .pages
            .get(page_no.number() as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(FileError::PageNotFound(page_no))?;

        buf.copy_from_slice(page.as_slice());
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
        let page = state
            .pages
            .get_mut(page_no.number() as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(FileError::PageNotFound(page_no))?;

        page.as_mut_slice().copy_from_slice(buf);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageNo, FileError> {
        let mut state = self.state.lock();

        if let Some(page_no) = state.free.pop() {
            state.pages[page_no.number() as usize] = Some(PageData::new());
            return Ok(page_no);
        }

        let page_no = PageNo::new(state.pages.len() as u64);
        state.pages.push(Some(PageData::new()));
        Ok(page_no)
    }

    fn dispose_page(&self, page_no: PageNo) -> Result<(), FileError> {
        let mut state = self.state.lock();

        let slot = state
            .pages
            .get_mut(page_no.number() as usize)
            .ok_or(FileError::PageNotFound(page_no))?;
        if slot.take().is_none() {
            return Err(FileError::PageNotFound(page_no));
        }

        state.free.push(page_no);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_read() {
        let file = MemoryFile::new();
        let page_no = file.allocate_page().unwrap();
        let mut buf = vec![0u8; PAGE_SIZE];
        file.read_page(page_no, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_and_read() {
        let file = MemoryFile::new();
        let page_no = file.allocate_page().unwrap();

        let mut write_buf = vec![0u8; PAGE_SIZE];
        write_buf[0] = 42;
        write_buf[100] = 99;
        file.write_page(page_no, &write_buf).unwrap();

        let mut read_buf = vec![0u8; PAGE_SIZE];
        file.read_page(page_no, &mut read_buf).unwrap();
        assert_eq!(read_buf[0], 42);
        assert_eq!(read_buf[100], 99);
    }

    #[test]
    fn test_page_not_found() {
        let file = MemoryFile::new();
        let mut buf = vec![0u8; PAGE_SIZE];
        let result = file.read_page(PageNo::new(999), &mut buf);
        assert!(matches!(result, Err(FileError::PageNotFound(_))));
    }

    #[test]
    fn test_invalid_buffer_size() {
        let file = MemoryFile::new();
        let page_no = file.allocate_page().unwrap();
        let mut buf = vec![0u8; 100];
        let result = file.read_page(page_no, &mut buf);
        assert!(matches!(result, Err(FileError::InvalidBufferSize { .. })));
    }

    #[test]
    fn test_dispose_retires_page() {
        let file = MemoryFile::new();
        let page_no = file.allocate_page().unwrap();
        assert_eq!(file.page_count(), 1);

        file.dispose_page(page_no).unwrap();
        assert_eq!(file.page_count(), 0);

        let mut buf = vec![0u8; PAGE_SIZE];
        let result = file.read_page(page_no, &mut buf);
        assert!(matches!(result, Err(FileError::PageNotFound(_))));

        // Double dispose is rejected
        let result = file.dispose_page(page_no);
        assert!(matches!(result, Err(FileError::PageNotFound(_))));
    }

    #[test]
    fn test_disposed_page_number_is_reused() {
        let file = MemoryFile::new();
        let first = file.allocate_page().unwrap();
        let second = file.allocate_page().unwrap();
        assert_ne!(first, second);

        file.dispose_page(first).unwrap();
        let third = file.allocate_page().unwrap();
        assert_eq!(third, first);

        // Reused pages read back as zeros
        let mut buf = vec![0u8; PAGE_SIZE];
        file.read_page(third, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }
}
