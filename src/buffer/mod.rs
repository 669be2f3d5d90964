//! Buffer pool management.
//!
//! The buffer pool caches file pages in a fixed set of in-memory frames.
//!
//! # Components
//! - [`BufferPoolManager`] - Pin/unpin/allocate/dispose/flush
//! - [`FrameDescriptor`] - Per-frame bookkeeping
//! - [`PageDirectory`] - `(file, page)` → frame index
//! - [`replacer`] - Clock eviction policy
//! - [`PageHandle`] - Scoped pin on a page
//! - [`BufferPoolStats`] - Performance statistics

mod buffer_pool_manager;
mod directory;
mod frame;
mod page_handle;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use directory::PageDirectory;
pub use frame::{FrameDescriptor, FrameInfo};
pub use page_handle::PageHandle;
pub use stats::{BufferPoolStats, StatsSnapshot};
