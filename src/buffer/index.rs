//! Page index: maps cached page identities to frames.

use std::collections::HashMap;

use super::frame::FrameId;
use crate::io::{FileRef, PageFile};
use crate::page::PageNo;

/// Page index errors.
///
/// These signal a damaged index structure, not an ordinary cache miss; a
/// miss is the `Ok(None)` outcome of [`PageIndex::lookup`].
#[derive(Debug, PartialEq, Eq)]
pub enum IndexError {
    /// Insert found the key already mapped to a frame.
    DuplicateEntry(PageNo),

    /// Remove found no entry for the key.
    MissingEntry(PageNo),

    /// The index structure itself is damaged.
    Corrupted(String),
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::DuplicateEntry(page_no) => {
                write!(f, "page {:?} is already indexed", page_no)
            }
            IndexError::MissingEntry(page_no) => {
                write!(f, "page {:?} is not indexed", page_no)
            }
            IndexError::Corrupted(msg) => write!(f, "index corruption: {}", msg),
        }
    }
}

impl std::error::Error for IndexError {}

/// Maps a (file, page number) identity to the frame caching it.
///
/// Every operation is failable: `lookup` separates the ordinary miss
/// (`Ok(None)`) from a damaged index (`Err`), and `insert`/`remove` report
/// structural faults such as duplicate or missing entries. The buffer
/// manager treats any `Err` as fatal to the operation in progress and never
/// conflates it with a miss.
pub trait PageIndex<F: PageFile>: Send {
    /// Records that `frame_id` now caches `(file, page_no)`.
    fn insert(
        &mut self,
        file: &FileRef<F>,
        page_no: PageNo,
        frame_id: FrameId,
    ) -> Result<(), IndexError>;

    /// Returns the frame caching `(file, page_no)`, or `None` on a miss.
    fn lookup(&self, file: &FileRef<F>, page_no: PageNo) -> Result<Option<FrameId>, IndexError>;

    /// Forgets the entry for `(file, page_no)`.
    fn remove(&mut self, file: &FileRef<F>, page_no: PageNo) -> Result<(), IndexError>;
}

/// HashMap-backed page index.
///
/// Lookup never fails for this implementation; the `Err` outcomes of
/// insert and remove surface bookkeeping bugs (double insert, removal of
/// an absent entry) rather than being silently absorbed.
pub struct HashIndex<F> {
    map: HashMap<(FileRef<F>, PageNo), FrameId>,
}

impl<F> HashIndex<F> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Returns the number of indexed pages.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<F> Default for HashIndex<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PageFile> PageIndex<F> for HashIndex<F> {
    fn insert(
        &mut self,
        file: &FileRef<F>,
        page_no: PageNo,
        frame_id: FrameId,
    ) -> Result<(), IndexError> {
        let key = (file.clone(), page_no);
        if self.map.contains_key(&key) {
            return Err(IndexError::DuplicateEntry(page_no));
        }
        self.map.insert(key, frame_id);
        Ok(())
    }

    fn lookup(&self, file: &FileRef<F>, page_no: PageNo) -> Result<Option<FrameId>, IndexError> {
        Ok(self.map.get(&(file.clone(), page_no)).copied())
    }

    fn remove(&mut self, file: &FileRef<F>, page_no: PageNo) -> Result<(), IndexError> {
        self.map
            .remove(&(file.clone(), page_no))
            .map(|_| ())
            .ok_or(IndexError::MissingEntry(page_no))
    }
}
