//! Scoped page handles.
//!
//! A [`PageHandle`] is the only way to touch a pinned page's bytes, and
//! releasing it is the only way to give the pin back:
//! - [`PageHandle::unpin`] releases explicitly and reports errors
//! - dropping the handle releases implicitly (errors are logged)
//! - [`PageHandle::leak`] keeps the pin for a later
//!   [`BufferPoolManager::unpin_page`]
//!
//! A handle is bound to one residency of its page. Once the page is
//! disposed or flushed out of the frame, every access through the handle
//! fails with `Error::PageNotBuffered`, even after the frame is reused.

use log::warn;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// A pin on one buffered page.
///
/// The frame cannot be evicted while the handle lives. Content is reached
/// through [`read`](Self::read) and [`write`](Self::write), which lock the
/// frame for the duration of the returned guard; several handles to the
/// same page may coexist.
///
/// # Example
/// ```ignore
/// let mut handle = bpm.pin_page(&file, page_id)?;
/// handle.write()?.as_mut_slice()[0] = 0xFF; // handle is now dirty
/// // handle drops here: page unpinned and marked dirty
/// ```
pub struct PageHandle<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    file_id: FileId,
    page_id: PageId,
    generation: u64,
    dirty: bool,
    released: bool,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        generation: u64,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            file_id,
            page_id,
            generation,
            dirty: false,
            released: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Frame holding the page.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Shared access to the page content.
    ///
    /// # Errors
    /// `Error::PageNotBuffered` if the page has left the frame.
    pub fn read(&self) -> Result<RwLockReadGuard<'_, Page>> {
        self.bpm
            .read_frame(self.frame_id, self.generation)
            .ok_or_else(|| self.not_buffered())
    }

    /// Exclusive access to the page content. Marks the handle dirty.
    ///
    /// # Errors
    /// `Error::PageNotBuffered` if the page has left the frame; the handle
    /// is not marked dirty.
    pub fn write(&mut self) -> Result<RwLockWriteGuard<'_, Page>> {
        let page = self
            .bpm
            .write_frame(self.frame_id, self.generation)
            .ok_or_else(|| self.not_buffered())?;
        self.dirty = true;
        Ok(page)
    }

    /// Have the page written back on release even without a `write()`.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether this handle will mark the page dirty on release.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Release the pin, reporting any error.
    ///
    /// # Errors
    /// `Error::PageNotBuffered` if the page was disposed or flushed out
    /// from under the handle.
    pub fn unpin(mut self) -> Result<()> {
        self.released = true;
        self.bpm.release(
            self.frame_id,
            self.file_id,
            self.page_id,
            self.generation,
            self.dirty,
        )
    }

    /// Give up the handle but keep the pin.
    ///
    /// Modifications made through the handle are recorded in the frame
    /// right away. The pin must later be released with
    /// [`BufferPoolManager::unpin_page`].
    pub fn leak(mut self) -> PageId {
        self.released = true;
        if self.dirty {
            self.bpm
                .mark_dirty(self.frame_id, self.file_id, self.page_id, self.generation);
        }
        self.page_id
    }

    fn not_buffered(&self) -> Error {
        Error::PageNotBuffered {
            file: self.file_id,
            page: self.page_id,
        }
    }
}

impl Drop for PageHandle<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.bpm.release(
            self.frame_id,
            self.file_id,
            self.page_id,
            self.generation,
            self.dirty,
        ) {
            warn!("dropping handle for {} {}: {}", self.file_id, self.page_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemFile, SharedFile};

    fn setup() -> (BufferPoolManager, SharedFile) {
        let file: SharedFile = Arc::new(MemFile::new());
        (BufferPoolManager::new(4), file)
    }

    #[test]
    fn test_drop_unpins() {
        let (bpm, file) = setup();
        let handle = bpm.allocate_page(&file).unwrap();
        let pid = handle.page_id();
        assert_eq!(bpm.pin_count(&file, pid), Some(1));

        drop(handle);
        assert_eq!(bpm.pin_count(&file, pid), Some(0));
        assert_eq!(bpm.is_dirty(&file, pid), Some(false));
    }

    #[test]
    fn test_write_marks_dirty_on_release() {
        let (bpm, file) = setup();
        let mut handle = bpm.allocate_page(&file).unwrap();
        let pid = handle.page_id();

        handle.write().unwrap().as_mut_slice()[0] = 0x5A;
        assert!(handle.is_dirty());
        assert_eq!(handle.read().unwrap().as_slice()[0], 0x5A);
        handle.unpin().unwrap();

        assert_eq!(bpm.is_dirty(&file, pid), Some(true));
    }

    #[test]
    fn test_mark_dirty_without_write() {
        let (bpm, file) = setup();
        let mut handle = bpm.allocate_page(&file).unwrap();
        let pid = handle.page_id();
        handle.mark_dirty();
        drop(handle);

        assert_eq!(bpm.is_dirty(&file, pid), Some(true));
    }

    #[test]
    fn test_leak_keeps_pin() {
        let (bpm, file) = setup();
        let mut handle = bpm.allocate_page(&file).unwrap();
        handle.write().unwrap().as_mut_slice()[1] = 1;
        let pid = handle.leak();

        assert_eq!(bpm.pin_count(&file, pid), Some(1));
        assert_eq!(bpm.is_dirty(&file, pid), Some(true));

        bpm.unpin_page(&file, pid, false).unwrap();
        assert_eq!(bpm.pin_count(&file, pid), Some(0));
        assert_eq!(bpm.is_dirty(&file, pid), Some(true));
    }

    #[test]
    fn test_unpin_after_dispose_fails() {
        let (bpm, file) = setup();
        let handle = bpm.allocate_page(&file).unwrap();
        let pid = handle.page_id();

        bpm.dispose_page(&file, pid).unwrap();
        assert!(matches!(handle.unpin(), Err(Error::PageNotBuffered { .. })));
    }

    #[test]
    fn test_stale_handle_does_not_unpin_recycled_frame() {
        let file: SharedFile = Arc::new(MemFile::new());
        let other: SharedFile = Arc::new(MemFile::new());
        let bpm = BufferPoolManager::new(1);
        let stale = bpm.allocate_page(&file).unwrap();

        bpm.dispose_page(&file, stale.page_id()).unwrap();
        let fresh = bpm.allocate_page(&other).unwrap();
        assert_eq!(fresh.frame_id(), stale.frame_id());
        assert_eq!(fresh.file_id(), other.id());

        drop(stale);
        assert_eq!(bpm.pin_count(&other, fresh.page_id()), Some(1));
    }

    #[test]
    fn test_stale_handle_cannot_touch_recycled_frame() {
        let file: SharedFile = Arc::new(MemFile::new());
        let other: SharedFile = Arc::new(MemFile::new());
        let bpm = BufferPoolManager::new(1);
        let mut stale = bpm.allocate_page(&file).unwrap();
        bpm.dispose_page(&file, stale.page_id()).unwrap();
        assert!(matches!(stale.read(), Err(Error::PageNotBuffered { .. })));

        let mut fresh = bpm.allocate_page(&other).unwrap();
        assert_eq!(fresh.frame_id(), stale.frame_id());
        fresh.write().unwrap().as_mut_slice()[0] = 0x11;

        assert!(matches!(stale.write(), Err(Error::PageNotBuffered { .. })));
        assert!(matches!(stale.read(), Err(Error::PageNotBuffered { .. })));
        assert!(!stale.is_dirty());
        assert_eq!(fresh.read().unwrap().as_slice()[0], 0x11);
    }

    #[test]
    fn test_stale_handle_loses_same_page_reloaded() {
        let file: SharedFile = Arc::new(MemFile::new());
        let bpm = BufferPoolManager::new(1);
        let mut handle = bpm.allocate_page(&file).unwrap();
        let pid = handle.page_id();

        bpm.dispose_page(&file, pid).unwrap();
        assert_eq!(file.allocate_page().unwrap(), pid);

        // Same page back in the same frame: the old handle still may not reach it.
        let fresh = bpm.pin_page(&file, pid).unwrap();
        assert_eq!(fresh.frame_id(), handle.frame_id());
        assert!(matches!(handle.write(), Err(Error::PageNotBuffered { .. })));
        assert!(matches!(handle.unpin(), Err(Error::PageNotBuffered { .. })));
        assert_eq!(bpm.pin_count(&file, pid), Some(1));
    }

    #[test]
    fn test_guard_held_across_dispose_does_not_block_pool() {
        let file: SharedFile = Arc::new(MemFile::new());
        let other: SharedFile = Arc::new(MemFile::new());
        let bpm = BufferPoolManager::new(1);
        let pid = other.allocate_page().unwrap();

        let stale = bpm.allocate_page(&file).unwrap();
        let guard = stale.read().unwrap();
        bpm.dispose_page(&file, stale.page_id()).unwrap();

        let err = bpm.pin_page(&other, pid).err().unwrap();
        assert!(matches!(err, Error::FrameBusy { frame } if frame == stale.frame_id()));
        assert_eq!(bpm.free_frame_count(), 1);
        assert_eq!(bpm.page_count(), 0);

        drop(guard);
        let fresh = bpm.pin_page(&other, pid).unwrap();
        assert_eq!(fresh.frame_id(), stale.frame_id());
    }
}
