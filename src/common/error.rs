//! Error types for the buffer pool.

use thiserror::Error;

use super::{FileId, FrameId, PageId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All failures the buffer pool and its files can report.
///
/// A directory miss is not an error: lookups return `Option` and the pool
/// resolves misses internally by reading the page in.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying file, passed through unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file has no such page (never allocated, or disposed).
    #[error("{page} not found")]
    PageNotFound { page: PageId },

    /// Every frame is pinned, or was re-referenced before its second chance ran out.
    ///
    /// The caller has to unpin something (or use a bigger pool) and retry.
    #[error("buffer pool exceeded: no evictable frame")]
    BufferExceeded,

    /// `flush_file` reached a frame of the file that is still pinned.
    ///
    /// Frames visited before this one have already been flushed.
    #[error("{page} of {file} is pinned")]
    PagePinned { file: FileId, page: PageId },

    /// A frame names an owning file but does not hold a valid page.
    ///
    /// This is an internal inconsistency.
    #[error("bad buffer in {frame}")]
    BadBuffer { frame: FrameId },

    /// The frame chosen for a page is still locked by a guard taken through
    /// a handle whose page has since been disposed.
    ///
    /// The pool does not wait for the guard. The frame is left as it was;
    /// retry once the guard is dropped.
    #[error("{frame} is locked by a stale page handle")]
    FrameBusy { frame: FrameId },

    /// A disk file's length is not a whole number of pages.
    #[error("file size {size} is not a multiple of the page size")]
    InvalidFileSize { size: u64 },

    /// Unpin of a page that is not in the buffer pool.
    #[error("{page} of {file} is not buffered")]
    PageNotBuffered { file: FileId, page: PageId },

    /// Unpin of a buffered page whose pin count is already zero.
    #[error("{page} of {file} is not pinned")]
    PageNotPinned { file: FileId, page: PageId },

    /// A page was registered in the directory twice.
    ///
    /// Indicates a bug in the pool; never occurs in correct operation.
    #[error("duplicate directory entry for {page} of {file}")]
    DuplicateEntry { file: FileId, page: PageId },
}
