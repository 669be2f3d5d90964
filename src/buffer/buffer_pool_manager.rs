//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between files and memory
//! - Pin-based reference counting
//! - Write-back of dirty pages on eviction, flush, and teardown
//! - Clock (second-chance) replacement

use std::fmt;

use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::frame::{FrameBuffer, FrameDescriptor, FrameInfo};
use crate::buffer::replacer::ClockReplacer;
use crate::buffer::{BufferPoolStats, PageDirectory, PageHandle};
use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::{Page, SharedFile};

/// Manages a fixed pool of frames caching pages of any number of files.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌───────────── state: Mutex<PoolState> ─────────────────┐   │
/// │  │ ┌──────────────┐ ┌──────────────────┐ ┌─────────────┐ │   │
/// │  │ │  directory   │ │ frames: Vec<     │ │   clock     │ │   │
/// │  │ │(File,Page)→Fid│─▶│ FrameDescriptor> │◀│ClockReplacer│ │   │
/// │  │ └──────────────┘ └──────────────────┘ └─────────────┘ │   │
/// │  └───────────────────────────────────────────────────────┘   │
/// │  ┌───────────────────────────────────────────────────────┐   │
/// │  │ buffers: Vec<FrameBuffer>  [P0] [P1] [P2] ...          │   │
/// │  └───────────────────────────────────────────────────────┘   │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` over descriptors, directory, and clock hand.
///   Every operation runs as a single critical section, including its
///   file I/O, so pin counts and validity are always read consistently
///   with victim selection.
/// - `buffers`: one `RwLock<Page>` per frame plus the frame's generation.
///   A [`PageHandle`] locks its page without the pool lock and is refused
///   once the frame's generation moves on. While holding the pool lock the
///   pool only `try_`-locks pages: a guard kept alive across
///   [`dispose_page`](Self::dispose_page) makes the next user of that frame
///   fail with [`Error::FrameBusy`] instead of blocking.
///
/// The pool never waits for a frame: when nothing is evictable the call
/// fails with [`Error::BufferExceeded`].
///
/// # Usage
/// ```
/// use std::sync::Arc;
/// use clockpool::{BufferPoolManager, MemFile, SharedFile};
///
/// let file: SharedFile = Arc::new(MemFile::new());
/// let bpm = BufferPoolManager::new(8);
///
/// let mut handle = bpm.allocate_page(&file)?;
/// handle.write()?.as_mut_slice()[0] = 0xAB;
/// let pid = handle.page_id();
/// handle.unpin()?; // dirty: written back on eviction or flush
///
/// let handle = bpm.pin_page(&file, pid)?;
/// assert_eq!(handle.read()?.as_slice()[0], 0xAB);
/// # Ok::<(), clockpool::Error>(())
/// ```
pub struct BufferPoolManager {
    /// Page buffers, indexed by `FrameId`.
    buffers: Vec<FrameBuffer>,

    state: Mutex<PoolState>,

    stats: BufferPoolStats,

    frame_count: usize,
}

struct PoolState {
    frames: Vec<FrameDescriptor>,
    directory: PageDirectory,
    clock: ClockReplacer,
}

impl BufferPoolManager {
    /// Create a buffer pool with `frame_count` frames.
    ///
    /// # Panics
    /// Panics if `frame_count` is 0.
    pub fn new(frame_count: usize) -> Self {
        assert!(frame_count > 0, "frame_count must be > 0");

        let buffers = (0..frame_count).map(|_| FrameBuffer::new()).collect();
        let frames = (0..frame_count)
            .map(|i| FrameDescriptor::new(FrameId::new(i)))
            .collect();

        Self {
            buffers,
            state: Mutex::new(PoolState {
                frames,
                directory: PageDirectory::new(frame_count),
                clock: ClockReplacer::new(frame_count),
            }),
            stats: BufferPoolStats::new(),
            frame_count,
        }
    }

    // ========================================================================
    // Public API: Pin and unpin
    // ========================================================================

    /// Pin page `page_id` of `file`, reading it in if it is not buffered.
    ///
    /// On a miss the clock picks a frame; if that frame holds a dirty page
    /// it is written back first.
    ///
    /// # Errors
    /// - `Error::BufferExceeded` if every frame is pinned
    /// - `Error::FrameBusy` if the victim is still locked by a stale guard;
    ///   the victim is left as it was
    /// - any error from the victim's write-back; the victim is left as it
    ///   was (still valid and dirty)
    /// - any error from reading the page; the chosen frame is left free
    pub fn pin_page(&self, file: &SharedFile, page_id: PageId) -> Result<PageHandle<'_>> {
        let file_id = file.id();
        let mut state = self.state.lock();

        if let Some(frame_id) = state.directory.lookup(file_id, page_id) {
            let desc = &mut state.frames[frame_id.0];
            let pin_count = desc.pin();
            self.stats.record_hit();
            trace!("pin {} {}: hit in {}, pin_count {}", file_id, page_id, frame_id, pin_count);
            return Ok(PageHandle::new(self, frame_id, file_id, page_id, desc.generation()));
        }

        self.stats.record_miss();
        let (frame_id, mut page) = self.acquire_frame(&mut state)?;
        file.read_page(page_id, &mut page)?;
        drop(page);
        self.stats.record_read();
        let generation = self.install(&mut state, file, page_id, frame_id)?;

        trace!("pin {} {}: miss, loaded into {}", file_id, page_id, frame_id);
        Ok(PageHandle::new(self, frame_id, file_id, page_id, generation))
    }

    /// Release one pin on page `page_id` of `file`.
    ///
    /// `is_dirty` is ORed into the frame's dirty flag. This is the
    /// counterpart of [`PageHandle::leak`]; handles that are dropped or
    /// [unpinned](PageHandle::unpin) release their pin themselves.
    ///
    /// # Errors
    /// - `Error::PageNotBuffered` if the page is not in the pool
    /// - `Error::PageNotPinned` if its pin count is already zero
    pub fn unpin_page(&self, file: &SharedFile, page_id: PageId, is_dirty: bool) -> Result<()> {
        let file_id = file.id();
        let mut state = self.state.lock();
        let frame_id = state
            .directory
            .lookup(file_id, page_id)
            .ok_or(Error::PageNotBuffered {
                file: file_id,
                page: page_id,
            })?;
        Self::unpin_frame(&mut state, frame_id, file_id, page_id, is_dirty)
    }

    // ========================================================================
    // Public API: Allocate and dispose pages
    // ========================================================================

    /// Allocate a new page in `file` and pin it in the pool.
    ///
    /// The page is pinned once and clean, with zeroed content. Callers that
    /// want it persisted must write it and unpin it dirty.
    ///
    /// # Errors
    /// - any error from the file's allocation
    /// - the same errors as a [`pin_page`](Self::pin_page) miss; the page
    ///   stays allocated in the file
    pub fn allocate_page(&self, file: &SharedFile) -> Result<PageHandle<'_>> {
        let file_id = file.id();
        let mut state = self.state.lock();

        let page_id = file.allocate_page()?;
        let (frame_id, mut page) = self.acquire_frame(&mut state)?;
        page.reset();
        drop(page);
        let generation = self.install(&mut state, file, page_id, frame_id)?;

        debug!("allocated {} {} in {}", file_id, page_id, frame_id);
        Ok(PageHandle::new(self, frame_id, file_id, page_id, generation))
    }

    /// Drop page `page_id` from the pool and dispose of it in `file`.
    ///
    /// The frame is freed whether or not the page is pinned, and dirty
    /// content is discarded. Handles still pinning the page can no longer
    /// reach the frame.
    ///
    /// # Errors
    /// Any error from the file's disposal.
    pub fn dispose_page(&self, file: &SharedFile, page_id: PageId) -> Result<()> {
        let file_id = file.id();
        let mut state = self.state.lock();

        if let Some(frame_id) = state.directory.remove(file_id, page_id) {
            let desc = &mut state.frames[frame_id.0];
            if desc.is_pinned() {
                warn!(
                    "disposing {} {} with pin_count {}",
                    file_id,
                    page_id,
                    desc.pin_count()
                );
            }
            self.retire(desc);
            debug!("disposed {} {}, freed {}", file_id, page_id, frame_id);
        }

        file.dispose_page(page_id)
    }

    // ========================================================================
    // Public API: Flush
    // ========================================================================

    /// Write back and evict every page of `file`.
    ///
    /// Frames are visited in order. The flush is not atomic: if it stops
    /// on an error, frames visited before that point stay flushed and
    /// evicted, and calling it again finishes the job.
    ///
    /// # Errors
    /// - `Error::PagePinned` on the first pinned page of the file
    /// - `Error::BadBuffer` if a frame owned by the file is not valid
    /// - `Error::FrameBusy` if a dirty page's frame is locked by a stale guard
    /// - any error from a write-back
    pub fn flush_file(&self, file: &SharedFile) -> Result<()> {
        let file_id = file.id();
        let mut state = self.state.lock();
        let PoolState {
            frames, directory, ..
        } = &mut *state;

        let mut flushed = 0usize;
        for desc in frames.iter_mut() {
            if desc.file_id() != Some(file_id) {
                continue;
            }
            if !desc.is_valid() {
                return Err(Error::BadBuffer {
                    frame: desc.frame_id(),
                });
            }
            if desc.is_pinned() {
                debug!("flush {}: stopped at pinned {}", file_id, desc.page_id());
                return Err(Error::PagePinned {
                    file: file_id,
                    page: desc.page_id(),
                });
            }

            if desc.is_dirty() {
                let frame_id = desc.frame_id();
                let page = self.buffers[frame_id.0]
                    .try_read()
                    .ok_or(Error::FrameBusy { frame: frame_id })?;
                file.write_page(desc.page_id(), &page)?;
                self.stats.record_write();
                desc.clear_dirty();
            }

            directory.remove(file_id, desc.page_id());
            self.retire(desc);
            flushed += 1;
        }

        debug!("flush {}: evicted {} pages", file_id, flushed);
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and inspection
    // ========================================================================

    /// Buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Number of frames in the pool.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of pages currently buffered.
    pub fn page_count(&self) -> usize {
        self.state.lock().directory.len()
    }

    /// Number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.state
            .lock()
            .frames
            .iter()
            .filter(|d| !d.is_valid())
            .count()
    }

    /// Pin count of a buffered page, or `None` if it is not buffered.
    pub fn pin_count(&self, file: &SharedFile, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = state.directory.lookup(file.id(), page_id)?;
        Some(state.frames[frame_id.0].pin_count())
    }

    /// Dirty flag of a buffered page, or `None` if it is not buffered.
    pub fn is_dirty(&self, file: &SharedFile, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        let frame_id = state.directory.lookup(file.id(), page_id)?;
        Some(state.frames[frame_id.0].is_dirty())
    }

    /// Snapshot of one frame's descriptor.
    pub fn frame_info(&self, frame_id: FrameId) -> Option<FrameInfo> {
        self.state.lock().frames.get(frame_id.0).map(|d| d.info())
    }

    // ========================================================================
    // Internal: Called by PageHandle
    // ========================================================================

    /// Lock a frame's page for reading, unless it moved past `generation`.
    pub(crate) fn read_frame(
        &self,
        frame_id: FrameId,
        generation: u64,
    ) -> Option<RwLockReadGuard<'_, Page>> {
        self.buffers[frame_id.0].read(generation)
    }

    /// Lock a frame's page for writing, unless it moved past `generation`.
    pub(crate) fn write_frame(
        &self,
        frame_id: FrameId,
        generation: u64,
    ) -> Option<RwLockWriteGuard<'_, Page>> {
        self.buffers[frame_id.0].write(generation)
    }

    /// Release a handle's pin on `frame_id`.
    pub(crate) fn release(
        &self,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        generation: u64,
        is_dirty: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.frames[frame_id.0].generation() != generation {
            return Err(Error::PageNotBuffered {
                file: file_id,
                page: page_id,
            });
        }
        Self::unpin_frame(&mut state, frame_id, file_id, page_id, is_dirty)
    }

    /// Record a handle's modifications without releasing its pin.
    pub(crate) fn mark_dirty(
        &self,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        generation: u64,
    ) {
        let mut state = self.state.lock();
        let desc = &mut state.frames[frame_id.0];
        if desc.generation() == generation && desc.holds(file_id, page_id) {
            desc.mark_dirty();
        }
    }

    // ========================================================================
    // Internal: Frame management
    // ========================================================================

    fn unpin_frame(
        state: &mut PoolState,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        is_dirty: bool,
    ) -> Result<()> {
        let desc = &mut state.frames[frame_id.0];

        // The frame may have been disposed and recycled under a live handle.
        if !desc.holds(file_id, page_id) {
            return Err(Error::PageNotBuffered {
                file: file_id,
                page: page_id,
            });
        }

        let pin_count = desc.unpin().ok_or(Error::PageNotPinned {
            file: file_id,
            page: page_id,
        })?;
        if is_dirty {
            desc.mark_dirty();
        }

        trace!("unpin {} {}: pin_count {}, dirty {}", file_id, page_id, pin_count, desc.is_dirty());
        Ok(())
    }

    /// Get a free frame from the clock, evicting its page if it holds one.
    ///
    /// Returns the frame locked for writing so the caller can fill it.
    fn acquire_frame(
        &self,
        state: &mut PoolState,
    ) -> Result<(FrameId, RwLockWriteGuard<'_, Page>)> {
        let PoolState {
            frames,
            directory,
            clock,
        } = state;

        let frame_id = clock.find_victim(frames)?;
        let page = self.buffers[frame_id.0].try_write().ok_or_else(|| {
            warn!("{} is still locked by a stale page handle", frame_id);
            Error::FrameBusy { frame: frame_id }
        })?;
        let desc = &mut frames[frame_id.0];
        if !desc.is_valid() {
            return Ok((frame_id, page));
        }

        let victim_page = desc.page_id();
        if desc.is_dirty() {
            if let Some(file) = desc.file() {
                file.write_page(victim_page, &page)?;
                self.stats.record_write();
                debug!("wrote back {} {} from {}", file.id(), victim_page, frame_id);
            }
        }

        if let Some(file_id) = desc.file_id() {
            directory.remove(file_id, victim_page);
        }
        self.retire(desc);
        self.stats.record_eviction();

        trace!("evicted {} from {}", victim_page, frame_id);
        Ok((frame_id, page))
    }

    /// Register a freshly filled frame. Returns the generation handles of
    /// this residency must carry.
    fn install(
        &self,
        state: &mut PoolState,
        file: &SharedFile,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Result<u64> {
        state.directory.insert(file.id(), page_id, frame_id)?;
        let desc = &mut state.frames[frame_id.0];
        desc.set(file.clone(), page_id);
        Ok(desc.generation())
    }

    /// Free a frame and cut off handles to the page it held.
    fn retire(&self, desc: &mut FrameDescriptor) {
        desc.clear();
        self.buffers[desc.frame_id().0].retire(desc.generation());
    }
}

impl Drop for BufferPoolManager {
    /// Last-chance write-back of every dirty page, pinned or not.
    ///
    /// Failures are logged and skipped.
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for desc in state.frames.iter().filter(|d| d.is_valid() && d.is_dirty()) {
            let Some(file) = desc.file() else {
                continue;
            };
            let page = self.buffers[desc.frame_id().0].get_mut();
            match file.write_page(desc.page_id(), page) {
                Ok(()) => {
                    self.stats.record_write();
                    debug!("teardown: wrote back {} {}", file.id(), desc.page_id());
                }
                Err(e) => warn!(
                    "teardown: failed to write back {} {}: {}",
                    file.id(),
                    desc.page_id(),
                    e
                ),
            }
        }
    }
}

impl fmt::Display for BufferPoolManager {
    /// One line per frame: page, pin count, and validity.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        writeln!(f, "Buffer pool ({} frames):", self.frame_count)?;
        for desc in &state.frames {
            writeln!(f, "{}", desc.info())?;
        }
        Ok(())
    }
}
