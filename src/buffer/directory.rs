//! Page directory - maps `(file, page)` to the frame holding it.

use std::collections::HashMap;

use crate::common::config::directory_capacity;
use crate::common::{Error, FileId, FrameId, PageId, Result};

/// Index from page identity to frame.
///
/// At most one frame may hold a given page, so a second insert of the same
/// key is an error. A lookup miss is an ordinary outcome and is reported
/// as `None`.
#[derive(Debug)]
pub struct PageDirectory {
    entries: HashMap<(FileId, PageId), FrameId>,
}

impl PageDirectory {
    /// Create a directory sized for a pool of `frame_count` frames.
    pub fn new(frame_count: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(directory_capacity(frame_count)),
        }
    }

    /// Register `frame_id` as holding `page_id` of `file_id`.
    ///
    /// # Errors
    /// `Error::DuplicateEntry` if the page is already registered; the
    /// existing entry is left in place.
    pub fn insert(&mut self, file_id: FileId, page_id: PageId, frame_id: FrameId) -> Result<()> {
        use std::collections::hash_map::Entry;

        match self.entries.entry((file_id, page_id)) {
            Entry::Occupied(_) => Err(Error::DuplicateEntry {
                file: file_id,
                page: page_id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(frame_id);
                Ok(())
            }
        }
    }

    /// Find the frame holding `page_id` of `file_id`.
    #[inline]
    pub fn lookup(&self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.entries.get(&(file_id, page_id)).copied()
    }

    /// Drop the entry for `page_id` of `file_id`, if there is one.
    pub fn remove(&mut self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.entries.remove(&(file_id, page_id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
