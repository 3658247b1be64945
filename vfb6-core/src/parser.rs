#![allow(clippy::unusual_byte_groupings)]
//! Low-level parsing of VFB6 raw words.
//!
//! Each frame starts with a 32-bit header word followed by body words. Body
//! words are split into two 16-bit half-words, low half first, and every
//! half-word is classified by its leading bits.

use crate::types::HalfWordTag;

// ============================================================================
// Frame header (32 bit)
// Bits: [31:16] event number | [15:13] unused | [12:0] body size in words
// ============================================================================

/// Extracts the raw 16-bit event number from a frame header word.
#[inline]
pub fn frame_event_nr(word: u32) -> i32 {
    ((word >> 16) & 0xFFFF) as i32
}

/// Extracts the number of body words following a frame header word.
#[inline]
pub fn frame_size(word: u32) -> usize {
    (word & 0x1FFF) as usize
}

/// Splits a body word into its half-words, low half first.
#[inline]
pub fn split_word(word: u32) -> [u16; 2] {
    [(word & 0xFFFF) as u16, ((word >> 16) & 0xFFFF) as u16]
}

/// Classifies a half-word.
///
/// The checks run from the shortest prefix to the longest and the first
/// match wins. Hit (`0`) must be tested before every `1xx` prefix.
#[inline]
pub fn classify(half: u16) -> HalfWordTag {
    if half >> 15 == 0b0 {
        HalfWordTag::Hit
    } else if half >> 13 == 0b100 {
        HalfWordTag::ClockInfo
    } else if half >> 13 == 0b110 {
        HalfWordTag::Header1
    } else if half >> 13 == 0b111 {
        HalfWordTag::Header2
    } else if half >> 11 == 0b10110 {
        HalfWordTag::Filler
    } else if half >> 12 == 0b1010 {
        HalfWordTag::Trailer
    } else {
        HalfWordTag::Unknown
    }
}

// ============================================================================
// HIT (prefix 0)
// Bits: [15] 0 | [14:8] channel | [7:0] fine time
// ============================================================================

/// Extracts the channel from a hit half-word.
#[inline]
pub fn hit_channel(half: u16) -> u8 {
    ((half >> 8) & 0x7F) as u8
}

/// Extracts the 8-bit fine time code from a hit half-word.
#[inline]
pub fn hit_fine_time(half: u16) -> u8 {
    (half & 0xFF) as u8
}

// ============================================================================
// CLOCKINFO (prefix 100) / HEADER1 (prefix 110) / HEADER2 (prefix 111)
// Bits: [15:13] prefix | [12:0] value
// ============================================================================

/// Extracts the 13-bit coarse clock from a clock-info half-word.
#[inline]
pub fn clock_value(half: u16) -> u16 {
    half & 0x1FFF
}

/// Extracts the 13-bit payload of a Header1 or Header2 half-word.
#[inline]
pub fn header_value(half: u16) -> u16 {
    half & 0x1FFF
}

// ============================================================================
// TRAILER (prefix 1010)
// Bits: [15:12] prefix | [11] unused | [10] old data ignored
//       | [9] data FIFO overflow | [8] trigger during busy | [7:0] event nr
// ============================================================================

/// Trigger-during-busy flag of a trailer half-word.
#[inline]
pub fn trailer_trigger_during_busy(half: u16) -> bool {
    (half >> 8) & 0x1 == 1
}

/// Data-FIFO-overflow flag of a trailer half-word.
#[inline]
pub fn trailer_data_fifo_overflow(half: u16) -> bool {
    (half >> 9) & 0x1 == 1
}

/// Old-TDC-data-ignored flag of a trailer half-word.
#[inline]
pub fn trailer_old_data_ignored(half: u16) -> bool {
    (half >> 10) & 0x1 == 1
}

/// Low 8 bits of the event number, repeated in the trailer.
#[inline]
pub fn trailer_event_nr(half: u16) -> u8 {
    (half & 0xFF) as u8
}
