//! Buffer manager implementation.

use std::fmt;

use parking_lot::Mutex;

use super::error::BufferError;
use super::frame::{Frame, FrameDescriptor, FrameId};
use super::guard::{PageReadGuard, PageWriteGuard};
use super::index::{HashIndex, PageIndex};
use super::replacer::{ClockReplacer, Replacer};
use crate::io::{FileRef, PageFile};
use crate::page::PageNo;

/// The buffer manager caches file pages in a fixed pool of frames and
/// manages their lifecycle.
///
/// Every page access goes through `fetch_page`/`fetch_page_mut`, which pin
/// the page into a frame; pinned frames are never reused. When a fetch
/// misses and no frame is free, the replacement policy picks an unpinned
/// victim, whose contents are written back first if dirty. One manager
/// serves any number of files; pages are cached under the (file handle,
/// page number) identity.
///
/// # Concurrency Model
///
/// The descriptor table, the page index and the replacement policy mutate
/// together under a single mutex, so each operation's replacement decision,
/// index update and descriptor update form one atomic unit. Page *contents*
/// are latched per frame; guard holders read and write them without
/// entering the critical section. File I/O is synchronous and blocks the
/// critical section that issued it.
///
/// # Latch Hierarchy
///
/// To prevent deadlocks, locks are acquired in this order:
/// 1. the state mutex (descriptors, index, replacer)
/// 2. frame data latches, and only for unpinned frames
///
/// Guards release in the opposite order: the pin is dropped before the
/// data latch.
pub struct BufferManager<F, R = ClockReplacer, I = HashIndex<F>>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    /// Frame array; each frame's bytes carry their own latch.
    frames: Vec<Frame>,

    /// Descriptor table, page index and replacement policy, mutated as one
    /// unit.
    state: Mutex<BufferState<F, R, I>>,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

struct BufferState<F, R, I>
where
    F: PageFile,
{
    descriptors: Vec<FrameDescriptor<F>>,
    replacer: R,
    index: I,
}

/// Diagnostic view of one frame's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// The frame this record describes.
    pub frame_id: FrameId,
    /// Whether the frame holds a live cached page.
    pub valid: bool,
    /// The cached page's number, if any.
    pub page_no: Option<PageNo>,
    /// Whether the cached copy has unwritten modifications.
    pub dirty: bool,
    /// Number of active pins.
    pub pin_count: u32,
}

impl<F: PageFile> BufferManager<F> {
    /// Creates a buffer manager with `pool_size` frames, the clock
    /// replacement policy and the hash page index.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        Self::with_parts(pool_size, ClockReplacer::new(pool_size), HashIndex::new())
    }
}

impl<F, R, I> BufferManager<F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    /// Creates a buffer manager with an explicit replacement policy and
    /// page index.
    ///
    /// # Panics
    ///
    /// Panics if `pool_size` is 0.
    pub fn with_parts(pool_size: usize, replacer: R, index: I) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<_> = (0..pool_size).map(|_| Frame::new()).collect();
        let descriptors: Vec<_> = (0..pool_size).map(|_| FrameDescriptor::new()).collect();

        Self {
            frames,
            state: Mutex::new(BufferState {
                descriptors,
                replacer,
                index,
            }),
            pool_size,
        }
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames currently holding a cached page.
    pub fn frame_count(&self) -> usize {
        let state = self.state.lock();
        state.descriptors.iter().filter(|desc| desc.valid).count()
    }

    /// Fetches a page for reading, pinning it into a frame.
    ///
    /// A cached page is pinned and returned without I/O; otherwise a frame
    /// is reused (evicting its previous page if necessary) and the page is
    /// read from its file. The pin is released when the guard is dropped,
    /// or handed to the caller with [`PageReadGuard::keep_pinned`].
    ///
    /// # Errors
    ///
    /// - `BufferError::OutOfFrames` if every frame is pinned
    /// - `BufferError::Io` if the read, or a victim's write-back, fails
    /// - `BufferError::Index` if the page index fails
    pub fn fetch_page(
        &self,
        file: &FileRef<F>,
        page_no: PageNo,
    ) -> Result<PageReadGuard<'_, F, R, I>, BufferError> {
        let frame_id = self.fetch_frame(file, page_no)?;
        let data = self.frames[frame_id.index()].data.read();
        Ok(PageReadGuard::new(self, frame_id, page_no, data))
    }

    /// Fetches a page for modification, pinning it into a frame.
    ///
    /// Same semantics as [`BufferManager::fetch_page`], but the returned
    /// guard allows mutation and tracks dirtiness.
    pub fn fetch_page_mut(
        &self,
        file: &FileRef<F>,
        page_no: PageNo,
    ) -> Result<PageWriteGuard<'_, F, R, I>, BufferError> {
        let frame_id = self.fetch_frame(file, page_no)?;
        let data = self.frames[frame_id.index()].data.write();
        Ok(PageWriteGuard::new(self, frame_id, page_no, data))
    }

    /// Releases one pin on a cached page.
    ///
    /// This is the by-hand counterpart of dropping a guard, for callers
    /// that took over a pin with `keep_pinned`. Passing `is_dirty = true`
    /// marks the page dirty; the flag is sticky and only cleared by a
    /// successful write-back.
    ///
    /// # Errors
    ///
    /// - `BufferError::PageNotFound` if the page is not cached
    /// - `BufferError::PageNotPinned` if its pin count is already zero
    /// - `BufferError::Index` if the page index fails
    pub fn unpin_page(
        &self,
        file: &FileRef<F>,
        page_no: PageNo,
        is_dirty: bool,
    ) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let Some(frame_id) = state.index.lookup(file, page_no)? else {
            return Err(BufferError::PageNotFound);
        };

        let desc = &mut state.descriptors[frame_id.index()];
        if desc.pin_count == 0 {
            return Err(BufferError::PageNotPinned);
        }
        desc.pin_count -= 1;
        if is_dirty {
            desc.dirty = true;
        }
        Ok(())
    }

    /// Allocates a new page in `file` and pins it into a frame.
    ///
    /// The page number is reserved by the file, the frame starts zeroed
    /// and clean, and the caller is expected to populate it through the
    /// returned guard before unpinning.
    ///
    /// # Errors
    ///
    /// - `BufferError::OutOfFrames` if every frame is pinned
    /// - `BufferError::Io` if the file cannot reserve a page, or a
    ///   victim's write-back fails
    /// - `BufferError::Index` if the page index fails
    pub fn allocate_page(
        &self,
        file: &FileRef<F>,
    ) -> Result<PageWriteGuard<'_, F, R, I>, BufferError> {
        let (frame_id, page_no) = {
            let mut state = self.state.lock();
            let state = &mut *state;

            let frame_id = self.allocate_frame(state)?;
            let page_no = file.allocate_page()?;

            {
                let mut data = self.frames[frame_id.index()].data.write();
                data.as_mut_slice().fill(0);
            }

            state.index.insert(file, page_no, frame_id)?;
            state.descriptors[frame_id.index()].set_loaded(file.clone(), page_no);
            (frame_id, page_no)
        };

        let data = self.frames[frame_id.index()].data.write();
        Ok(PageWriteGuard::new(self, frame_id, page_no, data))
    }

    /// Drops a page's cached copy, if any, and retires its page number.
    ///
    /// Dirty contents are discarded, not written back; disposal retires
    /// the page's persistent identity. A pinned page is refused.
    ///
    /// # Errors
    ///
    /// - `BufferError::PagePinned` if the page still has active pins
    /// - `BufferError::Io` if the file cannot retire the page number
    /// - `BufferError::Index` if the page index fails
    pub fn dispose_page(&self, file: &FileRef<F>, page_no: PageNo) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        let BufferState {
            descriptors, index, ..
        } = &mut *state;

        if let Some(frame_id) = index.lookup(file, page_no)? {
            let desc = &mut descriptors[frame_id.index()];
            if desc.pin_count > 0 {
                return Err(BufferError::PagePinned);
            }
            index.remove(file, page_no)?;
            desc.clear();
        }

        file.dispose_page(page_no)?;
        Ok(())
    }

    /// Writes back and drops every cached page belonging to `file`.
    ///
    /// Frames are handled one at a time: a dirty page is written back and
    /// its dirty flag cleared, then its index entry is removed and the
    /// frame invalidated. The first failure stops the operation; frames
    /// already flushed stay flushed. Frames caching other files are
    /// untouched.
    ///
    /// # Errors
    ///
    /// - `BufferError::PagePinned` if any of the file's pages is pinned
    /// - `BufferError::Io` if a write-back fails
    /// - `BufferError::Index` if the page index fails
    /// - `BufferError::InconsistentBuffer` if a descriptor names `file`
    ///   without holding a live page
    pub fn flush_file(&self, file: &FileRef<F>) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        let BufferState {
            descriptors, index, ..
        } = &mut *state;

        for (i, desc) in descriptors.iter_mut().enumerate() {
            if desc.file.as_ref() != Some(file) {
                continue;
            }
            let frame_id = FrameId::new(i as u32);

            if !desc.valid {
                return Err(BufferError::InconsistentBuffer { frame_id });
            }
            if desc.pin_count > 0 {
                return Err(BufferError::PagePinned);
            }
            let Some(page_no) = desc.page_no else {
                return Err(BufferError::InconsistentBuffer { frame_id });
            };

            if desc.dirty {
                let data = self.frames[i].data.read();
                file.write_page(page_no, data.as_slice())?;
                desc.dirty = false;
            }

            index.remove(file, page_no)?;
            desc.clear();
        }

        Ok(())
    }

    /// Returns the frame caching `(file, page_no)`, if any.
    pub fn cached_frame(&self, file: &FileRef<F>, page_no: PageNo) -> Option<FrameId> {
        let state = self.state.lock();
        state.index.lookup(file, page_no).ok().flatten()
    }

    /// Returns a diagnostic record for every frame.
    pub fn snapshot(&self) -> Vec<FrameInfo> {
        let state = self.state.lock();
        state
            .descriptors
            .iter()
            .enumerate()
            .map(|(i, desc)| FrameInfo {
                frame_id: FrameId::new(i as u32),
                valid: desc.valid,
                page_no: desc.page_no,
                dirty: desc.dirty,
                pin_count: desc.pin_count,
            })
            .collect()
    }

    /// Pins the page at `(file, page_no)` into a frame, loading it on a
    /// miss, and returns the frame.
    fn fetch_frame(&self, file: &FileRef<F>, page_no: PageNo) -> Result<FrameId, BufferError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        if let Some(frame_id) = state.index.lookup(file, page_no)? {
            let desc = &mut state.descriptors[frame_id.index()];
            desc.ref_bit = true;
            desc.pin_count += 1;
            return Ok(frame_id);
        }

        let frame_id = self.allocate_frame(state)?;
        {
            let mut data = self.frames[frame_id.index()].data.write();
            file.read_page(page_no, data.as_mut_slice())?;
        }
        state.index.insert(file, page_no, frame_id)?;
        state.descriptors[frame_id.index()].set_loaded(file.clone(), page_no);
        Ok(frame_id)
    }

    /// Obtains a reusable frame from the replacement policy, evicting the
    /// frame's previous page if it has one.
    ///
    /// A valid victim is un-indexed first and written back if dirty; only
    /// then is the frame handed out. If the write-back fails, the victim
    /// is re-indexed and the allocation is abandoned, so the page stays
    /// cached exactly as it was.
    fn allocate_frame(&self, state: &mut BufferState<F, R, I>) -> Result<FrameId, BufferError> {
        let BufferState {
            descriptors,
            replacer,
            index,
        } = state;

        let frame_id = replacer
            .victim(descriptors)
            .ok_or(BufferError::OutOfFrames)?;

        let desc = &descriptors[frame_id.index()];
        if desc.valid {
            let (Some(victim_file), Some(victim_page)) = (desc.file.clone(), desc.page_no) else {
                return Err(BufferError::InconsistentBuffer { frame_id });
            };
            let dirty = desc.dirty;

            index.remove(&victim_file, victim_page)?;
            if dirty {
                let data = self.frames[frame_id.index()].data.read();
                if let Err(e) = victim_file.write_page(victim_page, data.as_slice()) {
                    drop(data);
                    index.insert(&victim_file, victim_page, frame_id)?;
                    return Err(BufferError::Io(e));
                }
            }
        }

        descriptors[frame_id.index()].clear();
        Ok(frame_id)
    }

    /// Releases one pin on a frame (guard drop path).
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let mut state = self.state.lock();
        let desc = &mut state.descriptors[frame_id.index()];

        if desc.pin_count == 0 {
            debug_assert!(false, "unpin of frame {} with pin count 0", frame_id.index());
            return;
        }
        desc.pin_count -= 1;
        if is_dirty {
            desc.dirty = true;
        }
    }

    /// Marks a frame's page dirty without releasing its pin.
    pub(crate) fn mark_frame_dirty(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        let desc = &mut state.descriptors[frame_id.index()];
        if desc.valid {
            desc.dirty = true;
        }
    }
}

impl<F, R, I> fmt::Debug for BufferManager<F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferManager")
            .field("pool_size", &self.pool_size)
            .field("frames", &self.snapshot())
            .finish()
    }
}

impl<F, R, I> Drop for BufferManager<F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    /// Writes back every dirty cached page before the pool is torn down.
    ///
    /// Failures are reported on stderr and do not block teardown.
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (i, desc) in state.descriptors.iter().enumerate() {
            if !(desc.valid && desc.dirty) {
                continue;
            }
            let (Some(file), Some(page_no)) = (desc.file.as_ref(), desc.page_no) else {
                continue;
            };

            let data = self.frames[i].data.read();
            if let Err(e) = file.write_page(page_no, data.as_slice()) {
                eprintln!(
                    "WARNING: failed to write back page {:?} from frame {} at teardown: {}",
                    page_no, i, e
                );
            }
        }
    }
}
