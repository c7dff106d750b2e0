//! Frame slots and their descriptors.

use parking_lot::RwLock;

use crate::io::{FileRef, PageFile};
use crate::page::{PageData, PageNo};

/// Identifier for a frame within the buffer pool.
///
/// FrameId is an index into the pool's frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

impl FrameId {
    /// Creates a new FrameId.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the frame index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A frame slot holding one page's bytes while cached.
///
/// The bytes live behind their own RwLock so that pinned readers and
/// writers work on page contents without entering the manager's critical
/// section.
pub(crate) struct Frame {
    pub(crate) data: RwLock<PageData>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            data: RwLock::new(PageData::new()),
        }
    }
}

/// Bookkeeping for one frame slot.
///
/// Descriptors form an array parallel to the frame array; the descriptor at
/// index `i` describes what, if anything, occupies frame `i`. A frame is in
/// the page index exactly when its descriptor is valid; `owning file` and
/// `page number` survive invalidation only as stale debris, which the flush
/// path treats as an internal-consistency fault when it still names the
/// flushed file.
pub struct FrameDescriptor<F: PageFile> {
    pub(crate) file: Option<FileRef<F>>,
    pub(crate) page_no: Option<PageNo>,
    pub(crate) valid: bool,
    pub(crate) dirty: bool,
    pub(crate) ref_bit: bool,
    pub(crate) pin_count: u32,
}

impl<F: PageFile> FrameDescriptor<F> {
    /// Creates a descriptor for an unoccupied frame.
    pub(crate) fn new() -> Self {
        Self {
            file: None,
            page_no: None,
            valid: false,
            dirty: false,
            ref_bit: false,
            pin_count: 0,
        }
    }

    /// Returns whether the frame holds a live cached page.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns whether the cached copy has unwritten modifications.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the second-chance reference bit.
    pub fn ref_bit(&self) -> bool {
        self.ref_bit
    }

    /// Clears the reference bit, spending the page's second chance.
    pub fn clear_ref(&mut self) {
        self.ref_bit = false;
    }

    /// Returns the number of active pins on this frame.
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Returns the file mapped into this frame, if any.
    pub fn file(&self) -> Option<&FileRef<F>> {
        self.file.as_ref()
    }

    /// Returns the page number mapped into this frame, if any.
    pub fn page_no(&self) -> Option<PageNo> {
        self.page_no
    }

    /// Sets up the descriptor for a page just loaded or allocated into the
    /// frame: valid, clean, referenced, pinned once.
    pub(crate) fn set_loaded(&mut self, file: FileRef<F>, page_no: PageNo) {
        self.file = Some(file);
        self.page_no = Some(page_no);
        self.valid = true;
        self.dirty = false;
        self.ref_bit = true;
        self.pin_count = 1;
    }

    /// Returns the descriptor to the unoccupied state.
    pub(crate) fn clear(&mut self) {
        self.file = None;
        self.page_no = None;
        self.valid = false;
        self.dirty = false;
        self.ref_bit = false;
        self.pin_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryFile;

    #[test]
    fn test_frame_id() {
        let frame_id = FrameId::new(42);
        assert_eq!(frame_id.index(), 42);
    }

    #[test]
    fn test_descriptor_starts_unoccupied() {
        let desc: FrameDescriptor<MemoryFile> = FrameDescriptor::new();
        assert!(!desc.is_valid());
        assert!(!desc.is_dirty());
        assert!(!desc.ref_bit());
        assert_eq!(desc.pin_count(), 0);
        assert!(desc.file().is_none());
        assert!(desc.page_no().is_none());
    }

    #[test]
    fn test_descriptor_load_and_clear() {
        let file = FileRef::new(MemoryFile::new());
        let mut desc: FrameDescriptor<MemoryFile> = FrameDescriptor::new();

        desc.set_loaded(file.clone(), PageNo::new(7));
        assert!(desc.is_valid());
        assert!(!desc.is_dirty());
        assert!(desc.ref_bit());
        assert_eq!(desc.pin_count(), 1);
        assert_eq!(desc.file(), Some(&file));
        assert_eq!(desc.page_no(), Some(PageNo::new(7)));

        desc.clear();
        assert!(!desc.is_valid());
        assert_eq!(desc.pin_count(), 0);
        assert!(desc.file().is_none());
    }

    #[test]
    fn test_clear_ref_spends_second_chance() {
        let file = FileRef::new(MemoryFile::new());
        let mut desc: FrameDescriptor<MemoryFile> = FrameDescriptor::new();
        desc.set_loaded(file, PageNo::new(0));

        assert!(desc.ref_bit());
        desc.clear_ref();
        assert!(!desc.ref_bit());
    }
}
