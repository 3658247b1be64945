//! Output writers for decoded VFB6 data.
//!
//! Supports CSV for hits, events and calibration tables, plus a plain text
//! counter summary.

use crate::calibration::CalibrationTable;
use crate::types::{Counters, Event, HitRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// CSV writer for resolved hits.
pub struct HitCsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> HitCsvWriter<W> {
    /// Creates a new hit CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the column header.
    pub fn write_header(&mut self) -> Result<(), OutputError> {
        writeln!(
            self.writer,
            "event_nr,extended_event_nr,trigger_request,extended_trigger_request,channel,time_ns"
        )?;
        Ok(())
    }

    /// Writes a batch of hits.
    pub fn write_records(&mut self, records: &[HitRecord]) -> Result<(), OutputError> {
        for r in records {
            writeln!(
                self.writer,
                "{},{},{},{},{},{:.4}",
                r.event_nr,
                r.extended_event_nr,
                r.trigger_request,
                r.extended_trigger_request,
                r.channel,
                r.time_ns
            )?;
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// CSV writer for event summaries.
pub struct EventCsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> EventCsvWriter<W> {
    /// Creates a new event CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the column header.
    pub fn write_header(&mut self) -> Result<(), OutputError> {
        writeln!(
            self.writer,
            "event_nr,timestamp_1mu,trigger_request,n_hits,unfinalized_hits,trigger_during_busy"
        )?;
        Ok(())
    }

    /// Writes a batch of events.
    pub fn write_events(&mut self, events: &[Event]) -> Result<(), OutputError> {
        for e in events {
            writeln!(
                self.writer,
                "{},{},{},{},{},{}",
                e.event_nr,
                e.timestamp_1mu,
                e.trigger_request,
                e.n_hits(),
                e.unfinalized_hits,
                u8::from(e.trigger_during_busy)
            )?;
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes calibration tables, one row per channel: `channel,v0,...,v128`.
pub fn write_calibration<W: Write>(
    writer: W,
    tables: &[CalibrationTable],
) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(writer);
    for (channel, table) in tables.iter().enumerate() {
        write!(writer, "{}", channel)?;
        for v in table.as_slice() {
            write!(writer, ",{}", v)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a human-readable counter summary.
pub fn write_counters<W: Write>(mut writer: W, counters: &Counters) -> Result<(), OutputError> {
    writeln!(writer, "  Events:                {}", counters.event_counter)?;
    writeln!(writer, "  Hits:                  {}", counters.hit_counter)?;
    writeln!(writer, "  Trigger during busy:   {}", counters.trigger_during_busy)?;
    writeln!(writer, "  Data FIFO overflow:    {}", counters.data_fifo_overflow)?;
    writeln!(writer, "  Old TDC data ignored:  {}", counters.old_tdc_data_ignored)?;
    writeln!(writer, "  Time over the limit:   {}", counters.time_over_the_limit)?;
    writeln!(writer, "  Hits per event overflow: {}", counters.hits_per_event_overflow)?;
    writeln!(writer, "  Truncated frames:      {}", counters.truncated_frames)?;
    Ok(())
}

/// Convenience function to write hits to a CSV file.
pub fn write_hits_csv<P: AsRef<Path>>(path: P, records: &[HitRecord]) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = HitCsvWriter::new(file);
    writer.write_header()?;
    writer.write_records(records)?;
    writer.flush()?;
    Ok(())
}

/// Convenience function to write event summaries to a CSV file.
pub fn write_events_csv<P: AsRef<Path>>(path: P, events: &[Event]) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = EventCsvWriter::new(file);
    writer.write_header()?;
    writer.write_events(events)?;
    writer.flush()?;
    Ok(())
}

/// Convenience function to write calibration tables to a CSV file.
pub fn write_calibration_csv<P: AsRef<Path>>(
    path: P,
    tables: &[CalibrationTable],
) -> Result<(), OutputError> {
    let file = File::create(path)?;
    write_calibration(file, tables)
}
