//! clockpool - a buffer pool manager with clock (second-chance) replacement.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     callers (record / index layers)             │
//! └─────────────────────────────────────────────────────────────────┘
//!        pin_page / unpin_page / allocate_page / dispose_page / flush_file
//!                              ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Buffer Pool (buffer/)                            │
//! │   BufferPoolManager                                             │
//! │     ├─ PageDirectory   (file, page) → frame                     │
//! │     ├─ FrameDescriptor × N   pin count, dirty, reference bit    │
//! │     ├─ ClockReplacer   one clock hand, two-revolution bound     │
//! │     └─ Page × N        frame buffers                            │
//! └─────────────────────────────────────────────────────────────────┘
//!                              ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Storage (storage/)                               │
//! │   PageFile trait: read / write / allocate / dispose             │
//! │     ├─ DiskFile   one OS file, pages at N × PAGE_SIZE           │
//! │     └─ MemFile    in-memory                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, FileId, Error, config)
//! - [`buffer`] - Buffer pool management and clock replacement
//! - [`storage`] - Pages and the files they live in
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use clockpool::{BufferPoolManager, MemFile, SharedFile};
//!
//! let file: SharedFile = Arc::new(MemFile::new());
//! let bpm = BufferPoolManager::new(16);
//!
//! let mut page = bpm.allocate_page(&file)?;
//! page.write()?.as_mut_slice()[..5].copy_from_slice(b"hello");
//! drop(page);
//!
//! bpm.flush_file(&file)?;
//! # Ok::<(), clockpool::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

pub use common::config::PAGE_SIZE;
pub use common::{Error, FileId, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, FrameInfo, PageHandle, StatsSnapshot};
pub use storage::{DiskFile, MemFile, Page, PageFile, SharedFile};
