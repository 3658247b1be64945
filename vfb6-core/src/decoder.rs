//! Stateful VFB6 decoder.
//!
//! This module implements the frame parser. It owns the DNL histogram that
//! is filled while parsing, the calibration tables derived from it, the
//! diagnostic counters and the sequence extenders for event and trigger
//! numbers. One decoder should be used per data source.

use crate::calibration::{CalibrationTable, DnlHistogram};
use crate::config::DecoderConfig;
use crate::input::{self, InputError};
use crate::parser;
use crate::sequence::SequenceExtender;
use crate::time::{self, UniformSource};
use crate::types::{
    Counters, DecodeResult, Event, HalfWordTag, HitCode, HitRecord, RawHit, TimeInterpolation,
    CLOCK_HARD_LIMIT, MAX_HITS_PER_EVENT, MAX_HIT_CHANNEL, N_CHANNELS,
};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;

/// Event under construction.
///
/// Hits are first recorded as provisional [`RawHit`]s. The next valid clock
/// word commits every pending hit into the event as a packed [`HitCode`];
/// an out-of-window clock word drops them instead.
struct FrameBuilder {
    event: Event,
    pending: Vec<RawHit>,
    accepted: usize,
}

impl FrameBuilder {
    fn new(event_nr: i32) -> Self {
        Self {
            event: Event::new(event_nr),
            pending: Vec::new(),
            accepted: 0,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.accepted >= MAX_HITS_PER_EVENT
    }

    #[inline]
    fn push_pending(&mut self, hit: RawHit) {
        self.accepted += 1;
        self.pending.push(hit);
    }

    /// Commits all pending hits with `clock`, returning how many were committed.
    fn finalize_pending(&mut self, clock: u16) -> usize {
        let n = self.pending.len();
        self.event
            .hits
            .extend(self.pending.drain(..).map(|hit| hit.finalize(clock)));
        n
    }

    /// Drops all pending hits, returning how many were dropped.
    fn discard_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        self.event.unfinalized_hits += n as u32;
        n
    }

    fn finish(mut self) -> Event {
        self.discard_pending();
        self.event
    }
}

/// Stateful VFB6 decoder.
pub struct Vfb6Decoder {
    config: DecoderConfig,
    histogram: DnlHistogram,
    calibration: Vec<CalibrationTable>,
    counters: Counters,
    event_numbers: SequenceExtender,
    trigger_requests: SequenceExtender,
    rng: Box<dyn UniformSource + Send>,
}

impl fmt::Debug for Vfb6Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfb6Decoder")
            .field("config", &self.config)
            .field("counters", &self.counters)
            .field("event_numbers", &self.event_numbers)
            .field("trigger_requests", &self.trigger_requests)
            .finish_non_exhaustive()
    }
}

impl Default for Vfb6Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfb6Decoder {
    /// Creates a decoder with the default configuration and an entropy-seeded
    /// random source.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Creates a decoder with the given configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self::with_uniform_source(config, StdRng::from_entropy())
    }

    /// Creates a decoder with a fixed random source, e.g. a seeded RNG.
    pub fn with_uniform_source<U>(config: DecoderConfig, source: U) -> Self
    where
        U: UniformSource + Send + 'static,
    {
        Self {
            config,
            histogram: DnlHistogram::new(),
            calibration: vec![CalibrationTable::default(); N_CHANNELS],
            counters: Counters::default(),
            event_numbers: SequenceExtender::event_numbers(),
            trigger_requests: SequenceExtender::trigger_requests(),
            rng: Box::new(source),
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Replaces the configuration. Accumulated state is kept.
    pub fn set_config(&mut self, config: DecoderConfig) {
        self.config = config;
    }

    /// Returns the diagnostic counters.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Returns the DNL histogram accumulated so far.
    pub fn dnl_histogram(&self) -> &DnlHistogram {
        &self.histogram
    }

    /// Clears the DNL histogram and the cached calibration tables.
    ///
    /// Counters and sequence extenders are left untouched.
    pub fn reset(&mut self) {
        info!("Clearing DNL histogram and calibration tables");
        self.histogram.clear();
        self.calibration.fill(CalibrationTable::default());
    }

    /// Sets all diagnostic counters back to zero.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Restarts event and trigger-request numbering.
    pub fn reset_sequences(&mut self) {
        self.event_numbers.reset();
        self.trigger_requests.reset();
    }

    /// Parses the words in `[start, end)` and returns the decoded events.
    pub fn parse_range(&mut self, words: &[u32], start: usize, end: usize) -> Vec<Event> {
        let mut events = Vec::new();
        self.parse_range_into(words, start, end, &mut events);
        events
    }

    /// Parses the words in `[start, end)`, appending events to `events`.
    ///
    /// `end` is clamped to the buffer. A frame whose declared size runs past
    /// the range is decoded from the words that are available and counted
    /// in [`Counters::truncated_frames`]. Returns the number of events added.
    pub fn parse_range_into(
        &mut self,
        words: &[u32],
        start: usize,
        end: usize,
        events: &mut Vec<Event>,
    ) -> usize {
        let end = end.min(words.len());
        let appended_before = events.len();
        let frames_before = self.counters.event_counter;

        let mut di = start;
        while di < end {
            let header = words[di];
            di += 1;

            let declared_end = di.saturating_add(parser::frame_size(header));
            let body_end = declared_end.min(end);
            if body_end < declared_end {
                self.counters.truncated_frames += 1;
                warn!(
                    "Frame at word {} declares {} body words, only {} available",
                    di - 1,
                    declared_end - di,
                    body_end - di
                );
            }

            let mut frame = FrameBuilder::new(parser::frame_event_nr(header));
            for &word in &words[di..body_end] {
                for half in parser::split_word(word) {
                    self.process_half_word(&mut frame, half);
                }
            }
            di = declared_end;

            self.counters.event_counter += 1;
            let event = frame.finish();
            if self.config.return_events_with_no_hits || event.has_hits() {
                events.push(event);
            }
        }

        let appended = events.len() - appended_before;
        debug!(
            "Parsed {} frames, kept {} events",
            self.counters.event_counter - frames_before,
            appended
        );
        appended
    }

    fn process_half_word(&mut self, frame: &mut FrameBuilder, half: u16) {
        match parser::classify(half) {
            HalfWordTag::Hit => {
                if frame.is_full() {
                    self.counters.hits_per_event_overflow += 1;
                    trace!("Event {} hit capacity reached", frame.event.event_nr);
                    return;
                }

                let channel = parser::hit_channel(half);
                let fine_time = parser::hit_fine_time(half);
                if channel <= MAX_HIT_CHANNEL {
                    frame.push_pending(RawHit::new(channel, fine_time));
                    self.histogram
                        .record(usize::from(channel), usize::from(fine_time));
                }
            }

            HalfWordTag::ClockInfo => {
                let clock = parser::clock_value(half);
                // The firmware lets the first clock after the window through
                if u32::from(clock) < CLOCK_HARD_LIMIT
                    && u32::from(clock) < self.config.window_size_clocks
                {
                    let n = frame.finalize_pending(clock);
                    self.counters.hit_counter += n as u64;
                } else {
                    self.counters.time_over_the_limit += 1;
                    let dropped = frame.discard_pending();
                    trace!(
                        "Clock {} outside window in event {}, dropped {} hits",
                        clock,
                        frame.event.event_nr,
                        dropped
                    );
                }
            }

            HalfWordTag::Header1 => {
                frame.event.timestamp_1mu = u64::from(parser::header_value(half));
            }

            HalfWordTag::Header2 => {
                frame.event.trigger_request = i32::from(parser::header_value(half));
            }

            HalfWordTag::Trailer => {
                if parser::trailer_trigger_during_busy(half) {
                    self.counters.trigger_during_busy += 1;
                    frame.event.trigger_during_busy = true;
                }
                if parser::trailer_data_fifo_overflow(half) {
                    self.counters.data_fifo_overflow += 1;
                }
                if parser::trailer_old_data_ignored(half) {
                    self.counters.old_tdc_data_ignored += 1;
                }
            }

            HalfWordTag::Filler | HalfWordTag::Unknown => {}
        }
    }

    /// Integrates the histogram of one channel and caches the result.
    ///
    /// Returns `None` for a channel outside the module.
    pub fn channel_calibration(&mut self, channel: usize) -> Option<&CalibrationTable> {
        let table = self.histogram.row(channel).map(CalibrationTable::from_histogram_row)?;
        let slot = self.calibration.get_mut(channel)?;
        *slot = table;
        Some(&*slot)
    }

    /// Integrates the histograms of all channels and caches the results.
    pub fn calibration_tables(&mut self) -> &[CalibrationTable] {
        for (channel, slot) in self.calibration.iter_mut().enumerate() {
            *slot = self.histogram.calibration(channel);
        }
        info!("Rebuilt calibration tables for {} channels", N_CHANNELS);
        &self.calibration
    }

    /// Returns the cached calibration tables without recomputing them.
    pub fn cached_calibration(&self) -> &[CalibrationTable] {
        &self.calibration
    }

    /// Replaces the cached calibration table of a channel, e.g. with one
    /// restored from an earlier run. Returns false for an unknown channel.
    pub fn set_calibration(&mut self, channel: usize, table: CalibrationTable) -> bool {
        match self.calibration.get_mut(channel) {
            Some(slot) => {
                *slot = table;
                true
            }
            None => false,
        }
    }

    /// Decodes a hit time with the cached table of the hit's own channel.
    pub fn time(&mut self, hit: HitCode, interpolation: TimeInterpolation) -> f64 {
        let table = &self.calibration[usize::from(hit.channel())];
        time::decode_time(hit, table, interpolation, &mut *self.rng)
    }

    /// Decodes a hit time with an explicit table.
    pub fn time_with_table(
        &mut self,
        hit: HitCode,
        table: &CalibrationTable,
        interpolation: TimeInterpolation,
    ) -> f64 {
        time::decode_time(hit, table, interpolation, &mut *self.rng)
    }

    /// Decodes channel and time with the cached table of the hit's channel.
    pub fn time_and_channel(&mut self, hit: HitCode, interpolation: TimeInterpolation) -> (u8, f64) {
        (hit.channel(), self.time(hit, interpolation))
    }

    /// Extends a raw frame event number into a monotonic sequence number.
    pub fn extended_event_nr(&mut self, event_nr: i32) -> i64 {
        self.event_numbers.extend(event_nr)
    }

    /// Extends a raw trigger-request number into a monotonic sequence number.
    pub fn extended_trigger_request_nr(&mut self, trigger_request: i32) -> i64 {
        self.trigger_requests.extend(trigger_request)
    }

    /// Resolves every hit of `events` into a [`HitRecord`].
    ///
    /// This advances the decoder's own event and trigger-request extenders
    /// once per event, so consecutive batches continue the same numbering.
    /// Events must be passed in stream order and each event exactly once;
    /// resolving the same events again counts as a wrap. Call
    /// [`Self::reset_sequences`] before re-resolving from the start.
    ///
    /// A frame without event or trigger-request number (the `-1` marker)
    /// gets `-1` as extended number and leaves the extender untouched.
    pub fn hit_records(&mut self, events: &[Event]) -> Vec<HitRecord> {
        let interpolation = self.config.interpolation;
        let mut records = Vec::with_capacity(events.iter().map(Event::n_hits).sum());

        for event in events {
            let extended_event_nr = match event.event_nr {
                nr if nr < 0 => -1,
                nr => self.extended_event_nr(nr),
            };
            let extended_trigger_request = match event.trigger_request {
                nr if nr < 0 => -1,
                nr => self.extended_trigger_request_nr(nr),
            };
            for &hit in &event.hits {
                let (channel, time_ns) = self.time_and_channel(hit, interpolation);
                records.push(HitRecord {
                    event_nr: event.event_nr,
                    extended_event_nr,
                    trigger_request: event.trigger_request,
                    extended_trigger_request,
                    channel,
                    time_ns,
                });
            }
        }

        records
    }

    /// Decodes a raw word file from disk.
    ///
    /// The whole file is parsed as one module block.
    pub fn decode_file<P: AsRef<Path>>(&mut self, path: P) -> Result<DecodeResult, InputError> {
        let words = input::read_words(path.as_ref())?;
        info!("Read {} words from {:?}", words.len(), path.as_ref());
        let events = self.parse_range(&words, 0, words.len());

        Ok(DecodeResult {
            events,
            counters: self.counters,
            words_read: words.len(),
        })
    }
}
