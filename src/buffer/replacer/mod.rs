//! Eviction policy.
//!
//! - [`ClockReplacer`] - second-chance replacement with a single clock hand

mod clock;

pub use clock::ClockReplacer;
