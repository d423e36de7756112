//! Hand-off from the comparator interrupt to the sampling loop.
//!
//! The comparator rings around its trip point and fires up to three extra times per cycle. Only
//! the first event after [`CaptureCell::arm`] may latch a value. State and value share a single
//! atomic word so the latch is one compare-and-set: on thumbv6m that CAS comes from
//! `portable-atomic` running it inside a critical section.

use portable_atomic::{AtomicU32, Ordering};

use super::Reading;

/// Armed, nothing latched yet.
const PENDING: u32 = 0;
/// Set together with the latched counter value in the low half-word.
const DONE: u32 = 1 << 16;
/// Not armed. Comparator events are ignored.
const IDLE: u32 = 1 << 17;

/// Conversion state of the current sampling cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionState {
    Idle,
    Pending,
    Done,
}

pub struct CaptureCell {
    word: AtomicU32,
}

impl CaptureCell {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(IDLE),
        }
    }

    /// Start a conversion. Whatever the previous cycle latched is dropped.
    pub fn arm(&self) {
        self.word.store(PENDING, Ordering::Release);
    }

    /// Latch `count` if this is the first comparator event since [`arm`](Self::arm).
    ///
    /// Returns `false` for every later event of the same cycle and while idle. Called from the
    /// comparator interrupt.
    pub fn latch(&self, count: u16) -> bool {
        self.word
            .compare_exchange(
                PENDING,
                DONE | u32::from(count),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// End the conversion and take the latched reading.
    ///
    /// Must only be called once the charge window has elapsed. Returns [`Reading::NONE`] if the
    /// comparator never fired.
    pub fn finish(&self) -> Reading {
        let word = self.word.swap(IDLE, Ordering::AcqRel);
        if word & DONE == 0 {
            Reading::NONE
        } else {
            Reading::new(word as u16)
        }
    }

    pub fn state(&self) -> ConversionState {
        match self.word.load(Ordering::Acquire) {
            PENDING => ConversionState::Pending,
            IDLE => ConversionState::Idle,
            _ => ConversionState::Done,
        }
    }
}

impl Default for CaptureCell {
    fn default() -> Self {
        Self::new()
    }
}
