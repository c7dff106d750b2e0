//! RAII guards for pinned pages.
//!
//! Guards hold a pin and a latch on the frame's bytes; dropping a guard
//! releases both, so a page can never stay pinned by accident. Callers
//! that manage pins by hand can consume a guard with `keep_pinned` and
//! release the pin later through `BufferManager::unpin_page`.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::frame::FrameId;
use super::index::{HashIndex, PageIndex};
use super::manager::BufferManager;
use super::replacer::{ClockReplacer, Replacer};
use crate::io::PageFile;
use crate::page::{PageData, PageNo};

/// Shared read access to a pinned page.
///
/// Several read guards may target the same page at once. While any guard
/// is alive the page is pinned and cannot be evicted.
///
/// Acquiring a write guard for a page while holding a read guard for it
/// blocks until the read guard is dropped.
pub struct PageReadGuard<'a, F, R = ClockReplacer, I = HashIndex<F>>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    manager: &'a BufferManager<F, R, I>,
    frame_id: FrameId,
    page_no: PageNo,
    data: RwLockReadGuard<'a, PageData>,
    unpin_on_drop: bool,
}

impl<'a, F, R, I> PageReadGuard<'a, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    pub(super) fn new(
        manager: &'a BufferManager<F, R, I>,
        frame_id: FrameId,
        page_no: PageNo,
        data: RwLockReadGuard<'a, PageData>,
    ) -> Self {
        Self {
            manager,
            frame_id,
            page_no,
            data,
            unpin_on_drop: true,
        }
    }

    /// Returns the number of the guarded page.
    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    /// Returns the page bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Consumes the guard, releasing the latch but keeping the pin.
    ///
    /// The caller takes over the pin and must release it with
    /// [`BufferManager::unpin_page`].
    pub fn keep_pinned(mut self) -> PageNo {
        self.unpin_on_drop = false;
        self.page_no
    }
}

impl<F, R, I> Drop for PageReadGuard<'_, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    fn drop(&mut self) {
        if self.unpin_on_drop {
            self.manager.unpin_frame(self.frame_id, false);
        }
    }
}

impl<F, R, I> Deref for PageReadGuard<'_, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Exclusive write access to a pinned page.
///
/// Mutating the page through the guard marks it dirty; the dirty flag is
/// handed to the manager when the guard is dropped, so the page is written
/// back before its frame is reused.
pub struct PageWriteGuard<'a, F, R = ClockReplacer, I = HashIndex<F>>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    manager: &'a BufferManager<F, R, I>,
    frame_id: FrameId,
    page_no: PageNo,
    data: RwLockWriteGuard<'a, PageData>,
    dirty: bool,
    unpin_on_drop: bool,
}

impl<'a, F, R, I> PageWriteGuard<'a, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    pub(super) fn new(
        manager: &'a BufferManager<F, R, I>,
        frame_id: FrameId,
        page_no: PageNo,
        data: RwLockWriteGuard<'a, PageData>,
    ) -> Self {
        Self {
            manager,
            frame_id,
            page_no,
            data,
            dirty: false,
            unpin_on_drop: true,
        }
    }

    /// Returns the number of the guarded page.
    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    /// Returns the page bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Returns the page bytes mutably and marks the page dirty.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.dirty = true;
        self.data.as_mut_slice()
    }

    /// Marks the page dirty without touching its bytes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Consumes the guard, releasing the latch but keeping the pin.
    ///
    /// Modifications made through the guard are recorded as dirty before
    /// the latch is released. The caller takes over the pin and must
    /// release it with [`BufferManager::unpin_page`].
    pub fn keep_pinned(mut self) -> PageNo {
        if self.dirty {
            self.manager.mark_frame_dirty(self.frame_id);
        }
        self.unpin_on_drop = false;
        self.page_no
    }
}

impl<F, R, I> Drop for PageWriteGuard<'_, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    fn drop(&mut self) {
        if self.unpin_on_drop {
            self.manager.unpin_frame(self.frame_id, self.dirty);
        }
    }
}

impl<F, R, I> Deref for PageWriteGuard<'_, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<F, R, I> DerefMut for PageWriteGuard<'_, F, R, I>
where
    F: PageFile,
    R: Replacer,
    I: PageIndex<F>,
{
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}
