//! Disk file - page I/O against one OS file.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::trace;
use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, FileId, PageId, Result};

use super::{Page, PageFile};

/// A [`PageFile`] stored in a single OS file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Disposed page numbers are kept on an in-memory free list and reused by
/// [`allocate_page`](PageFile::allocate_page), lowest first. The free list
/// is not persisted: after a reopen every page in the file counts as live.
///
/// # Durability
/// Every write and allocation is followed by `fsync()`.
pub struct DiskFile {
    id: FileId,
    inner: Mutex<DiskFileInner>,
}

struct DiskFileInner {
    file: File,
    /// Number of page slots in the file, live or disposed.
    page_count: u32,
    free_pages: BTreeSet<u32>,
}

impl DiskFileInner {
    fn check_live(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.page_count || self.free_pages.contains(&page_id.0) {
            return Err(Error::PageNotFound { page: page_id });
        }
        Ok(())
    }

    fn seek_to(&mut self, page_id: PageId) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl DiskFile {
    /// Create a new, empty file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self::from_parts(file, 0))
    }

    /// Open an existing file.
    ///
    /// # Errors
    /// - an I/O error if the file doesn't exist or cannot be opened
    /// - `Error::InvalidFileSize` if the file ends in a partial page or has
    ///   more pages than a `PageId` can address
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(Error::InvalidFileSize { size: file_size });
        }
        let page_count = u32::try_from(file_size / PAGE_SIZE as u64)
            .map_err(|_| Error::InvalidFileSize { size: file_size })?;

        Ok(Self::from_parts(file, page_count))
    }

    /// Open an existing file, or create it if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_parts(file: File, page_count: u32) -> Self {
        Self {
            id: FileId::next(),
            inner: Mutex::new(DiskFileInner {
                file,
                page_count,
                free_pages: BTreeSet::new(),
            }),
        }
    }

    /// Number of page slots in the file, including disposed ones.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.inner.lock().page_count
    }

    /// Total size of the file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (PAGE_SIZE as u64)
    }
}

impl PageFile for DiskFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_live(page_id)?;
        inner.seek_to(page_id)?;
        inner.file.read_exact(page.as_mut_slice())?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_live(page_id)?;
        inner.seek_to(page_id)?;
        inner.file.write_all(page.as_slice())?;
        inner.file.sync_all()?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();

        let (page_id, reused) = match inner.free_pages.first().copied() {
            Some(n) => (PageId::new(n), true),
            None => (PageId::new(inner.page_count), false),
        };

        inner.seek_to(page_id)?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;
        inner.file.sync_all()?;

        if reused {
            inner.free_pages.remove(&page_id.0);
        } else {
            inner.page_count += 1;
        }
        trace!("{}: allocated {} (reused: {})", self.id, page_id, reused);
        Ok(page_id)
    }

    fn dispose_page(&self, page_id: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_live(page_id)?;
        inner.free_pages.insert(page_id.0);
        trace!("{}: disposed {}", self.id, page_id);
        Ok(())
    }
}
