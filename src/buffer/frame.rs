//! Frame descriptors - per-frame bookkeeping for the buffer pool.
//!
//! A [`FrameDescriptor`] records what a frame holds:
//! - Which page of which file is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking
//! - Reference bit for clock replacement
//! - Generation, bumped whenever the frame gives up its page
//!
//! The page bytes live next door in a [`FrameBuffer`], which carries a copy
//! of the generation so handles can check it without the pool lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FileId, FrameId, PageId};
use crate::storage::{Page, SharedFile};

/// Bookkeeping for one frame of the buffer pool.
///
/// Descriptors live in the pool's frame table, indexed by the same
/// [`FrameId`] as the page buffers. They are only touched while the pool
/// lock is held, so the fields are plain values.
///
/// # Invariants
/// - `dirty` implies `valid`
/// - a free frame has no owning file and `PageId::INVALID`
/// - `generation` changes every time the frame is cleared, so a
///   (frame, generation) pair names one residency of one page
pub struct FrameDescriptor {
    frame_id: FrameId,
    file: Option<SharedFile>,
    page_id: PageId,
    valid: bool,
    dirty: bool,
    reference_bit: bool,
    pin_count: u32,
    generation: u64,
}

impl FrameDescriptor {
    /// Create a free descriptor for frame `frame_id`.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: PageId::INVALID,
            valid: false,
            dirty: false,
            reference_bit: false,
            pin_count: 0,
            generation: 0,
        }
    }

    /// Record that this frame now holds `page_id` of `file`.
    ///
    /// The frame becomes valid, pinned once, referenced, and clean.
    pub fn set(&mut self, file: SharedFile, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.valid = true;
        self.dirty = false;
        self.reference_bit = true;
        self.pin_count = 1;
    }

    /// Return the frame to the free state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = PageId::INVALID;
        self.valid = false;
        self.dirty = false;
        self.reference_bit = false;
        self.pin_count = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The owning file, if any.
    #[inline]
    pub fn file(&self) -> Option<&SharedFile> {
        self.file.as_ref()
    }

    /// Identity of the owning file, if any.
    #[inline]
    pub fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|f| f.id())
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this frame holds `page_id` of the file identified by `file_id`.
    #[inline]
    pub fn holds(&self, file_id: FileId, page_id: PageId) -> bool {
        self.valid && self.page_id == page_id && self.file_id() == Some(file_id)
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Pin the frame for another holder and mark it recently used.
    #[inline]
    pub fn pin(&mut self) -> u32 {
        self.reference_bit = true;
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop one pin. Returns the new pin count, or `None` if it was already zero.
    #[inline]
    pub fn unpin(&mut self) -> Option<u32> {
        self.pin_count = self.pin_count.checked_sub(1)?;
        Some(self.pin_count)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    // ========================================================================
    // Dirty flag and reference bit
    // ========================================================================

    /// Mark the frame dirty. Ignored on a free frame.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty |= self.valid;
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn reference_bit(&self) -> bool {
        self.reference_bit
    }

    #[inline]
    pub fn clear_reference_bit(&mut self) {
        self.reference_bit = false;
    }

    /// Mark the frame invalid while leaving its owner in place.
    #[cfg(test)]
    pub(crate) fn force_invalid(&mut self) {
        self.valid = false;
    }

    /// Copy out the descriptor's state.
    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            frame_id: self.frame_id,
            file_id: self.file_id(),
            page_id: self.page_id,
            valid: self.valid,
            dirty: self.dirty,
            reference_bit: self.reference_bit,
            pin_count: self.pin_count,
        }
    }
}

/// The page buffer of one frame.
///
/// Handles lock the page first and then compare generations, while the
/// pool publishes a new generation before it refills the page and only
/// ever `try_`-locks it. A guard handed out for one residency therefore
/// never sees the bytes of the next.
pub(crate) struct FrameBuffer {
    page: RwLock<Page>,
    generation: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Shared access for a handle of `generation`.
    pub fn read(&self, generation: u64) -> Option<RwLockReadGuard<'_, Page>> {
        let page = self.page.read();
        self.is_current(generation).then_some(page)
    }

    /// Exclusive access for a handle of `generation`.
    pub fn write(&self, generation: u64) -> Option<RwLockWriteGuard<'_, Page>> {
        let page = self.page.write();
        self.is_current(generation).then_some(page)
    }

    /// Shared access for the pool, which must not block.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Page>> {
        self.page.try_read()
    }

    /// Exclusive access for the pool, which must not block.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, Page>> {
        self.page.try_write()
    }

    /// Page content, given sole ownership of the pool.
    pub fn get_mut(&mut self) -> &mut Page {
        self.page.get_mut()
    }

    /// Publish the descriptor's generation after a clear.
    pub fn retire(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

/// A point-in-time copy of a [`FrameDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub file_id: Option<FileId>,
    pub page_id: PageId,
    pub valid: bool,
    pub dirty: bool,
    pub reference_bit: bool,
    pub pin_count: u32,
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame_id)?;
        match self.file_id {
            Some(file_id) if self.valid => write!(f, "\t{} {}", file_id, self.page_id)?,
            _ => write!(f, "\t<free>")?,
        }
        write!(f, "\tpin_count: {}", self.pin_count)?;
        if self.dirty {
            write!(f, "\tdirty")?;
        }
        if self.valid {
            write!(f, "\tvalid")?;
        }
        Ok(())
    }
}
