//! File identity type.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_FILE_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies an open file for the lifetime of the process.
///
/// Every [`PageFile`](crate::storage::PageFile) takes a fresh id when it is
/// opened; two handles to the same path are still distinct files to the
/// buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a FileId from a raw value.
    #[inline]
    pub fn new(id: u32) -> Self {
        FileId(id)
    }

    /// Hand out the next unused id.
    pub fn next() -> Self {
        FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}
