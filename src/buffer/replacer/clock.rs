//! CLOCK (second-chance) replacement policy.

use log::trace;

use crate::buffer::frame::FrameDescriptor;
use crate::common::{Error, FrameId, Result};

/// Second-chance victim selection over the frame table.
///
/// The replacer owns nothing but the clock hand. Each call to
/// [`find_victim`](Self::find_victim) advances the hand first, so a scan
/// always starts one past where the previous one stopped:
///
/// ```text
///            hand
///             │
///   ┌────┬────▼───┬────┬────┐
///   │ F0 │ F1 │ F2 │ F3 │ F4 │   invalid          → take it
///   └────┴────┴────┴────┴────┘   referenced       → clear bit, move on
///                                pinned           → move on
///                                otherwise        → victim
/// ```
///
/// A frame whose reference bit is cleared on the first revolution is
/// taken on the second if it is still unpinned, so the scan is capped at
/// two revolutions.
#[derive(Debug)]
pub struct ClockReplacer {
    hand: usize,
    frame_count: usize,
}

impl ClockReplacer {
    /// Create a replacer for `frame_count` frames.
    ///
    /// The hand starts on the last frame so the first scan begins at frame 0.
    pub fn new(frame_count: usize) -> Self {
        Self {
            hand: frame_count.saturating_sub(1),
            frame_count,
        }
    }

    /// Current position of the clock hand.
    #[inline]
    pub fn hand(&self) -> FrameId {
        FrameId::new(self.hand)
    }

    #[inline]
    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.frame_count;
    }

    /// Pick a frame to recycle.
    ///
    /// Only reference bits and the hand are modified: writing back the
    /// victim and unregistering its page is the caller's job.
    ///
    /// # Errors
    /// `Error::BufferExceeded` if two full revolutions find nothing, i.e.
    /// every frame is pinned.
    pub fn find_victim(&mut self, frames: &mut [FrameDescriptor]) -> Result<FrameId> {
        debug_assert_eq!(frames.len(), self.frame_count);
        if self.frame_count == 0 {
            return Err(Error::BufferExceeded);
        }

        for _ in 0..2 * self.frame_count {
            self.advance();
            let desc = &mut frames[self.hand];

            if !desc.is_valid() {
                trace!("clock: {} is free", desc.frame_id());
                return Ok(desc.frame_id());
            }
            if desc.reference_bit() {
                desc.clear_reference_bit();
                continue;
            }
            if desc.is_pinned() {
                continue;
            }

            trace!("clock: victim {} ({})", desc.frame_id(), desc.page_id());
            return Ok(desc.frame_id());
        }

        Err(Error::BufferExceeded)
    }
}
