//! In-memory [`PageFile`].

use log::trace;
use parking_lot::Mutex;

use crate::common::{Error, FileId, PageId, Result};

use super::{Page, PageFile};

/// A [`PageFile`] held entirely in memory.
///
/// Same contract as [`DiskFile`](super::DiskFile): disposed page numbers
/// are reused lowest-first, and touching a disposed or unallocated page is
/// [`Error::PageNotFound`]. Contents vanish when the file is dropped.
pub struct MemFile {
    id: FileId,
    pages: Mutex<Vec<Option<Box<Page>>>>,
}

impl MemFile {
    /// Create an empty in-memory file.
    pub fn new() -> Self {
        Self {
            id: FileId::next(),
            pages: Mutex::new(Vec::new()),
        }
    }

    /// Number of live (allocated, not disposed) pages.
    pub fn live_pages(&self) -> usize {
        self.pages.lock().iter().filter(|p| p.is_some()).count()
    }
}

impl Default for MemFile {
    fn default() -> Self {
        Self::new()
    }
}

impl PageFile for MemFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<()> {
        let pages = self.pages.lock();
        match pages.get(page_id.0 as usize) {
            Some(Some(stored)) => {
                page.copy_from(stored);
                Ok(())
            }
            _ => Err(Error::PageNotFound { page: page_id }),
        }
    }

    fn write_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        let mut pages = self.pages.lock();
        match pages.get_mut(page_id.0 as usize) {
            Some(Some(stored)) => {
                stored.copy_from(page);
                Ok(())
            }
            _ => Err(Error::PageNotFound { page: page_id }),
        }
    }

    fn allocate_page(&self) -> Result<PageId> {
        let mut pages = self.pages.lock();
        let slot = match pages.iter().position(Option::is_none) {
            Some(slot) => {
                pages[slot] = Some(Box::new(Page::new()));
                slot
            }
            None => {
                pages.push(Some(Box::new(Page::new())));
                pages.len() - 1
            }
        };
        let page_id = PageId::new(slot as u32);
        trace!("{}: allocated {}", self.id, page_id);
        Ok(page_id)
    }

    fn dispose_page(&self, page_id: PageId) -> Result<()> {
        let mut pages = self.pages.lock();
        match pages.get_mut(page_id.0 as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                trace!("{}: disposed {}", self.id, page_id);
                Ok(())
            }
            _ => Err(Error::PageNotFound { page: page_id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_sequential() {
        let file = MemFile::new();
        assert_eq!(file.allocate_page().unwrap(), PageId::new(0));
        assert_eq!(file.allocate_page().unwrap(), PageId::new(1));
        assert_eq!(file.live_pages(), 2);
    }

    #[test]
    fn test_write_then_read() {
        let file = MemFile::new();
        let pid = file.allocate_page().unwrap();

        let mut page = Page::new();
        page.as_mut_slice()[7] = 0x77;
        file.write_page(pid, &page).unwrap();

        let mut read = Page::new();
        file.read_page(pid, &mut read).unwrap();
        assert_eq!(read.as_slice()[7], 0x77);
    }

    #[test]
    fn test_dispose_reuses_lowest_slot() {
        let file = MemFile::new();
        for _ in 0..4 {
            file.allocate_page().unwrap();
        }
        file.dispose_page(PageId::new(2)).unwrap();
        file.dispose_page(PageId::new(1)).unwrap();
        assert_eq!(file.live_pages(), 2);

        let mut page = Page::new();
        assert!(matches!(
            file.read_page(PageId::new(1), &mut page),
            Err(Error::PageNotFound { .. })
        ));
        assert_eq!(file.allocate_page().unwrap(), PageId::new(1));
        assert_eq!(file.allocate_page().unwrap(), PageId::new(2));
        assert_eq!(file.allocate_page().unwrap(), PageId::new(4));
    }

    #[test]
    fn test_missing_page() {
        let file = MemFile::new();
        let page = Page::new();
        assert!(file.write_page(PageId::new(0), &page).is_err());
        assert!(file.dispose_page(PageId::new(0)).is_err());
    }
}
