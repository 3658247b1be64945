//! Extension of wrapping hardware counters into monotonic sequence numbers.

use crate::types::{EVENT_NR_MODULUS, TRIGGER_REQUEST_MODULUS};

/// Converts a wrapping hardware counter into a 64-bit sequence number
/// relative to the first value seen.
///
/// A decrease between two consecutive raw values counts as exactly one wrap,
/// so callers must feed values in stream order and at most one wrap may
/// happen between two calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceExtender {
    start: i32,
    last: i32,
    offset: i64,
    modulus: i64,
}

impl SequenceExtender {
    /// Creates an extender for a counter wrapping at `modulus`.
    pub fn new(modulus: i64) -> Self {
        Self {
            start: -1,
            last: 0,
            offset: 0,
            modulus,
        }
    }

    /// Extender for the 16-bit frame event number.
    pub fn event_numbers() -> Self {
        Self::new(EVENT_NR_MODULUS)
    }

    /// Extender for the 13-bit trigger-request number.
    pub fn trigger_requests() -> Self {
        Self::new(TRIGGER_REQUEST_MODULUS)
    }

    /// Extends one raw counter value.
    pub fn extend(&mut self, raw: i32) -> i64 {
        if self.start < 0 {
            self.start = raw;
        } else if raw < self.last {
            self.offset += self.modulus;
        }

        self.last = raw;
        self.offset + i64::from(raw) - i64::from(self.start)
    }

    /// Forgets the start value and accumulated wraps.
    pub fn reset(&mut self) {
        *self = Self::new(self.modulus);
    }

    /// Returns true once the first value has been seen.
    pub fn is_initialized(&self) -> bool {
        self.start >= 0
    }

    /// Wrap modulus of this counter.
    pub fn modulus(&self) -> i64 {
        self.modulus
    }

    /// Number of wraps detected so far.
    pub fn wraps(&self) -> i64 {
        self.offset / self.modulus
    }
}
