//! Unpacker library for the ELB VFB6 VME time-to-digital converter.
//!
//! This crate decodes the raw 32-bit word stream of a VFB6 TDC into per-trigger
//! events, accumulates the differential non-linearity (DNL) of every channel
//! while doing so, and turns packed hit codes into calibrated times.
//!
//! # Example
//!
//! ```no_run
//! use vfb6_core::{TimeInterpolation, Vfb6Decoder};
//!
//! # let words: Vec<u32> = Vec::new();
//! let mut decoder = Vfb6Decoder::new();
//! let events = decoder.parse_range(&words, 0, words.len());
//! decoder.calibration_tables();
//!
//! for event in &events {
//!     for &hit in &event.hits {
//!         let (channel, t) = decoder.time_and_channel(hit, TimeInterpolation::Linear);
//!         println!("event {} channel {} at {:.3} ns", event.event_nr, channel, t);
//!     }
//! }
//! println!("{} hits finalized", decoder.counters().hit_counter);
//! ```
//!
//! # Features
//!
//! - Frame parsing with deferred hit finalization on clock words
//! - DNL histogram and calibration table per channel
//! - Time decoding with none, linear or random interpolation
//! - Wrap-around correction of event and trigger-request numbers
//! - Hardware anomalies reported as counters, never as errors

pub mod calibration;
pub mod config;
pub mod decoder;
pub mod input;
pub mod output;
pub mod parser;
pub mod sequence;
pub mod time;
pub mod types;

// Re-export commonly used types
pub use calibration::{CalibrationTable, DnlHistogram};
pub use config::{ConfigError, DecoderConfig};
pub use decoder::Vfb6Decoder;
pub use input::InputError;
pub use output::OutputError;
pub use sequence::SequenceExtender;
pub use time::{decode_channel, decode_time, decode_time_and_channel, UniformSource};
pub use types::{
    Counters, DecodeResult, Event, HalfWordTag, HitCode, HitRecord, RawHit, TimeInterpolation,
};
