//! The file interface consumed by the buffer pool.

use std::sync::Arc;

use crate::common::{FileId, PageId, Result};

use super::Page;

/// A file the buffer pool can read and write pages of.
///
/// The buffer pool only ever calls these four page operations; how pages
/// are laid out and persisted is up to the implementation. Methods take
/// `&self` so one file can be shared between the pool and its users;
/// implementations serialize access internally.
///
/// Every failure is returned unchanged to the buffer pool's caller.
pub trait PageFile: Send + Sync {
    /// Identity of this file, stable for as long as it is open.
    fn id(&self) -> FileId;

    /// Read page `page_id` into `page`.
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Write `page` as the content of page `page_id`.
    fn write_page(&self, page_id: PageId, page: &Page) -> Result<()>;

    /// Allocate a new zeroed page and return its number.
    fn allocate_page(&self) -> Result<PageId>;

    /// Release page `page_id`; its number may be handed out again.
    fn dispose_page(&self, page_id: PageId) -> Result<()>;
}

/// A file shared between the buffer pool and its callers.
pub type SharedFile = Arc<dyn PageFile>;
