//! Common types shared across the crate.
//!
//! - Configuration constants
//! - Error types
//! - Identifiers (PageId, FrameId, FileId)

pub mod config;
pub mod error;
mod file_id;
mod frame_id;
mod page_id;

pub use error::{Error, Result};
pub use file_id::FileId;
pub use frame_id::FrameId;
pub use page_id::PageId;
