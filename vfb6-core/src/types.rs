//! Core types for VFB6 TDC event data.
//!
//! This module defines the half-word tags, hit codes, events and diagnostic
//! counters produced by the VFB6 unpacker, together with the constants fixed
//! by the module firmware.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of TDC channels defined by the firmware.
pub const N_CHANNELS: usize = 128;

/// Number of entries in one calibration table (128 fine-time codes + 1 guard entry).
pub const N_TIME_BINS: usize = 129;

/// Number of DNL histogram bins per channel (two banks of [`N_TIME_BINS`]).
pub const N_DNL_BINS: usize = N_TIME_BINS * 2;

/// Maximum number of hits stored for one trigger event.
pub const MAX_HITS_PER_EVENT: usize = 256;

/// Highest channel number accepted from a hit half-word.
pub const MAX_HIT_CHANNEL: u8 = 96;

/// Clock values at or above this bound are never accepted, whatever the window.
pub const CLOCK_HARD_LIMIT: u32 = 250;

/// Default trigger window in TDC clocks (250 * 5 ns = 1250 ns).
pub const DEFAULT_WINDOW_SIZE_CLOCKS: u32 = 250;

/// Length of one coarse-clock unit of a hit code, in nanoseconds.
pub const CLOCK_PERIOD_NS: f64 = 2.5;

/// Wrap modulus of the 16-bit hardware event number.
pub const EVENT_NR_MODULUS: i64 = 0x10000;

/// Wrap modulus of the 13-bit hardware trigger-request number.
pub const TRIGGER_REQUEST_MODULUS: i64 = 0x2000;

/// Semantic tag of one 16-bit half-word of a frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfWordTag {
    /// Event timestamp header (prefix `110`).
    Header1,
    /// Trigger-request header (prefix `111`).
    Header2,
    /// Channel + fine time hit (prefix `0`).
    Hit,
    /// Coarse clock of the preceding hits (prefix `100`).
    ClockInfo,
    /// Padding (prefix `10110`).
    Filler,
    /// Frame trailer carrying status flags (prefix `1010`).
    Trailer,
    /// Anything else.
    Unknown,
}

/// A provisional hit: channel and fine time seen before the frame's clock word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHit {
    /// Channel number (7 bits)
    pub channel: u8,
    /// Fine time code (8 bits, the top bit selects the half clock period)
    pub fine_time: u8,
}

impl RawHit {
    /// Creates a new provisional hit.
    #[inline]
    pub fn new(channel: u8, fine_time: u8) -> Self {
        Self { channel, fine_time }
    }

    /// Folds the coarse clock into the hit, producing the final packed code.
    #[inline]
    pub fn finalize(self, clock: u16) -> HitCode {
        HitCode::pack(self.channel, clock, self.fine_time)
    }
}

/// A finalized, packed hit code.
///
/// Layout: `channel` in bits 21-27, coarse clock in bits 8-20 and the 8-bit
/// fine time in bits 0-7. Read back, bits 7-20 form the coarse clock in
/// half-clock units and bits 0-6 index the calibration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct HitCode(pub u32);

impl HitCode {
    /// Packs channel, 13-bit clock and 8-bit fine time into a hit code.
    #[inline]
    pub fn pack(channel: u8, clock: u16, fine_time: u8) -> Self {
        let channel = u32::from(channel & 0x7F);
        let clock = u32::from(clock & 0x1FFF);
        Self((channel << 21) | (clock << 8) | u32::from(fine_time))
    }

    /// Returns the raw 32-bit value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Channel number, bits 21-27.
    #[inline]
    pub fn channel(self) -> u8 {
        ((self.0 >> 21) & 0x7F) as u8
    }

    /// Coarse clock in half-clock units, bits 7-20.
    #[inline]
    pub fn coarse_clock(self) -> u32 {
        (self.0 >> 7) & 0x3FFF
    }

    /// Fine time code used as calibration index, bits 0-6.
    #[inline]
    pub fn fine_time(self) -> usize {
        (self.0 & 0x7F) as usize
    }
}

impl From<u32> for HitCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// One decoded trigger frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Raw 16-bit event number from the frame header (-1 until set)
    pub event_nr: i32,
    /// Coarse header timestamp, stored verbatim from the Header1 word
    pub timestamp_1mu: u64,
    /// Raw 13-bit trigger-request number (-1 if the frame had no Header2 word)
    pub trigger_request: i32,
    /// Finalized hit codes, at most [`MAX_HITS_PER_EVENT`]
    pub hits: Vec<HitCode>,
    /// Trailer reported a trigger during busy
    pub trigger_during_busy: bool,
    /// Hits accepted in this frame that never received a valid clock word
    pub unfinalized_hits: u32,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            event_nr: -1,
            timestamp_1mu: 0,
            trigger_request: -1,
            hits: Vec::new(),
            trigger_during_busy: false,
            unfinalized_hits: 0,
        }
    }
}

impl Event {
    /// Creates an empty event with the given raw event number.
    pub fn new(event_nr: i32) -> Self {
        Self {
            event_nr,
            ..Self::default()
        }
    }

    /// Number of finalized hits.
    #[inline]
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    /// Returns true when at least one hit was finalized.
    #[inline]
    pub fn has_hits(&self) -> bool {
        !self.hits.is_empty()
    }
}

/// Interpolation policy applied to the fine time code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInterpolation {
    /// Lower edge of the calibrated bin
    #[default]
    None,
    /// Center of the calibrated bin
    Linear,
    /// Uniform sample inside the calibrated bin
    Random,
}

impl FromStr for TimeInterpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "linear" => Ok(Self::Linear),
            "random" => Ok(Self::Random),
            other => Err(format!(
                "Unknown interpolation: {}. Use none, linear or random",
                other
            )),
        }
    }
}

/// Diagnostic counters accumulated over the lifetime of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Trailers with the trigger-during-busy bit (bit 8)
    pub trigger_during_busy: u64,
    /// Trailers with the data-FIFO-overflow bit (bit 9)
    pub data_fifo_overflow: u64,
    /// Trailers with the old-TDC-data-ignored bit (bit 10)
    pub old_tdc_data_ignored: u64,
    /// Clock words outside the accepted window
    pub time_over_the_limit: u64,
    /// Hits dropped because the event already held the maximum
    pub hits_per_event_overflow: u64,
    /// Frames processed
    pub event_counter: u64,
    /// Hits finalized with a valid clock
    pub hit_counter: u64,
    /// Frames whose declared size ran past the parsed range
    pub truncated_frames: u64,
}

impl Counters {
    /// Sets every counter back to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sum of all error counters (everything except events and hits).
    pub fn error_count(&self) -> u64 {
        self.trigger_during_busy
            + self.data_fifo_overflow
            + self.old_tdc_data_ignored
            + self.time_over_the_limit
            + self.hits_per_event_overflow
            + self.truncated_frames
    }
}

/// One finalized hit resolved to physical units, ready for output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Raw event number of the owning frame
    pub event_nr: i32,
    /// Wrap-corrected event number
    pub extended_event_nr: i64,
    /// Raw trigger-request number of the owning frame
    pub trigger_request: i32,
    /// Wrap-corrected trigger-request number
    pub extended_trigger_request: i64,
    /// Channel number
    pub channel: u8,
    /// Calibrated hit time in nanoseconds
    pub time_ns: f64,
}

/// Result of decoding a VFB6 word file.
#[derive(Debug)]
pub struct DecodeResult {
    /// Decoded events
    pub events: Vec<Event>,
    /// Counter snapshot taken after decoding
    pub counters: Counters,
    /// Number of 32-bit words read from the file
    pub words_read: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_code_layout() {
        let code = HitCode::pack(42, 100, 0x85);
        assert_eq!(code.raw(), (42 << 21) | (100 << 8) | 0x85);
        assert_eq!(code.channel(), 42);
        // top fine-time bit lands in the coarse clock as a half period
        assert_eq!(code.coarse_clock(), 201);
        assert_eq!(code.fine_time(), 0x05);
    }

    #[test]
    fn test_raw_hit_finalize() {
        let code = RawHit::new(96, 0x7F).finalize(249);
        assert_eq!(code.channel(), 96);
        assert_eq!(code.coarse_clock(), 249 * 2);
        assert_eq!(code.fine_time(), 127);
    }

    #[test]
    fn test_event_defaults() {
        let event = Event::default();
        assert_eq!(event.event_nr, -1);
        assert_eq!(event.trigger_request, -1);
        assert!(!event.has_hits());
        assert_eq!(Event::new(7).event_nr, 7);
    }

    #[test]
    fn test_interpolation_from_str() {
        assert_eq!("none".parse(), Ok(TimeInterpolation::None));
        assert_eq!("Linear".parse(), Ok(TimeInterpolation::Linear));
        assert_eq!(" random ".parse(), Ok(TimeInterpolation::Random));
        assert!("cubic".parse::<TimeInterpolation>().is_err());
    }

    #[test]
    fn test_counters_reset() {
        let mut counters = Counters {
            time_over_the_limit: 3,
            hit_counter: 10,
            ..Counters::default()
        };
        assert_eq!(counters.error_count(), 3);
        counters.reset();
        assert_eq!(counters, Counters::default());
    }
}
