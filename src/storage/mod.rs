//! Storage layer - the files the buffer pool reads and writes.
//!
//! - [`Page`] - The raw 4KB unit of I/O
//! - [`PageFile`] - Page-level file interface consumed by the buffer pool
//! - [`DiskFile`] - File-backed implementation
//! - [`MemFile`] - In-memory implementation

mod disk_file;
mod file;
mod mem_file;
mod page;

pub use disk_file::DiskFile;
pub use file::{PageFile, SharedFile};
pub use mem_file::MemFile;
pub use page::Page;
