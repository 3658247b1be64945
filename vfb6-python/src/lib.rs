//! Python bindings for the VFB6 TDC unpacker with numpy support.
//!
//! This module provides Python bindings using PyO3 that expose the stateful
//! decoder, its calibration tables and counters, with decoded data handed
//! over as numpy arrays.

use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray1};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;
use vfb6_core::types::{N_CHANNELS, N_TIME_BINS};
use vfb6_core::{decode_channel, DecoderConfig, Event, HitCode, TimeInterpolation, Vfb6Decoder};

fn parse_interpolation(name: &str) -> PyResult<TimeInterpolation> {
    name.parse().map_err(PyValueError::new_err)
}

/// Container for decoded events in columnar form.
///
/// Hits of event `i` are `hits[hit_offsets[i]:hit_offsets[i + 1]]`.
#[pyclass]
pub struct Events {
    event_nr: Vec<i32>,
    timestamp_1mu: Vec<u64>,
    trigger_request: Vec<i32>,
    trigger_during_busy: Vec<bool>,
    unfinalized_hits: Vec<u32>,
    hit_offsets: Vec<u64>,
    hits: Vec<u32>,
}

#[pymethods]
impl Events {
    /// Returns the number of events.
    fn __len__(&self) -> usize {
        self.event_nr.len()
    }

    /// Returns a string representation.
    fn __repr__(&self) -> String {
        format!(
            "Events(count={}, hits={})",
            self.event_nr.len(),
            self.hits.len()
        )
    }

    /// Raw 16-bit event numbers.
    #[getter]
    fn event_nr<'py>(&self, py: Python<'py>) -> &'py PyArray1<i32> {
        self.event_nr.clone().into_pyarray(py)
    }

    /// Header timestamps.
    #[getter]
    fn timestamp_1mu<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.timestamp_1mu.clone().into_pyarray(py)
    }

    /// Raw trigger-request numbers (-1 when the frame had none).
    #[getter]
    fn trigger_request<'py>(&self, py: Python<'py>) -> &'py PyArray1<i32> {
        self.trigger_request.clone().into_pyarray(py)
    }

    /// Trigger-during-busy flags.
    #[getter]
    fn trigger_during_busy<'py>(&self, py: Python<'py>) -> &'py PyArray1<bool> {
        self.trigger_during_busy.clone().into_pyarray(py)
    }

    /// Hits per event that never received a valid clock word.
    #[getter]
    fn unfinalized_hits<'py>(&self, py: Python<'py>) -> &'py PyArray1<u32> {
        self.unfinalized_hits.clone().into_pyarray(py)
    }

    /// Offsets into `hits`, one more than the number of events.
    #[getter]
    fn hit_offsets<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.hit_offsets.clone().into_pyarray(py)
    }

    /// Packed hit codes of all events.
    #[getter]
    fn hits<'py>(&self, py: Python<'py>) -> &'py PyArray1<u32> {
        self.hits.clone().into_pyarray(py)
    }
}

impl Events {
    fn from_events(events: Vec<Event>) -> Self {
        let len = events.len();
        let mut out = Self {
            event_nr: Vec::with_capacity(len),
            timestamp_1mu: Vec::with_capacity(len),
            trigger_request: Vec::with_capacity(len),
            trigger_during_busy: Vec::with_capacity(len),
            unfinalized_hits: Vec::with_capacity(len),
            hit_offsets: Vec::with_capacity(len + 1),
            hits: Vec::new(),
        };

        out.hit_offsets.push(0);
        for event in events {
            out.event_nr.push(event.event_nr);
            out.timestamp_1mu.push(event.timestamp_1mu);
            out.trigger_request.push(event.trigger_request);
            out.trigger_during_busy.push(event.trigger_during_busy);
            out.unfinalized_hits.push(event.unfinalized_hits);
            out.hits.extend(event.hits.iter().map(|h| h.raw()));
            out.hit_offsets.push(out.hits.len() as u64);
        }

        out
    }
}

/// Stateful VFB6 decoder.
///
/// Example:
///     >>> import vfb6
///     >>> dec = vfb6.Decoder(window_size_clocks=250)
///     >>> events = dec.parse(words)
///     >>> table = dec.calibration_table()
///     >>> t = dec.time(events.hits[0], "linear")
#[pyclass(name = "Decoder")]
pub struct PyDecoder {
    inner: Vfb6Decoder,
}

#[pymethods]
impl PyDecoder {
    #[new]
    #[pyo3(signature = (window_size_clocks=250, return_events_with_no_hits=false))]
    fn new(window_size_clocks: u32, return_events_with_no_hits: bool) -> PyResult<Self> {
        let config = DecoderConfig::default()
            .with_window_size_clocks(window_size_clocks)
            .with_empty_events(return_events_with_no_hits);
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self {
            inner: Vfb6Decoder::with_config(config),
        })
    }

    /// Parses `words[start:end]` and returns the decoded events.
    #[pyo3(signature = (words, start=0, end=None))]
    fn parse(
        &mut self,
        py: Python<'_>,
        words: PyReadonlyArray1<u32>,
        start: usize,
        end: Option<usize>,
    ) -> PyResult<Py<Events>> {
        let words = words.as_slice()?;
        let end = end.unwrap_or(words.len());
        let events = self.inner.parse_range(words, start, end);
        Py::new(py, Events::from_events(events))
    }

    /// Decodes a raw word file.
    fn parse_file(&mut self, py: Python<'_>, path: &str) -> PyResult<Py<Events>> {
        let result = self
            .inner
            .decode_file(PathBuf::from(path))
            .map_err(|e| PyIOError::new_err(format!("Failed to decode file: {}", e)))?;
        Py::new(py, Events::from_events(result.events))
    }

    /// Rebuilds and returns all calibration tables as a (128, 129) array.
    fn calibration_table<'py>(&mut self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        let flat: Vec<f64> = self
            .inner
            .calibration_tables()
            .iter()
            .flat_map(|t| t.as_slice().iter().copied())
            .collect();
        flat.into_pyarray(py).reshape([N_CHANNELS, N_TIME_BINS])
    }

    /// Rebuilds and returns the calibration table of one channel.
    fn channel_calibration_table<'py>(
        &mut self,
        py: Python<'py>,
        channel: usize,
    ) -> PyResult<&'py PyArray1<f64>> {
        let table = self
            .inner
            .channel_calibration(channel)
            .ok_or_else(|| PyValueError::new_err(format!("No such channel: {}", channel)))?;
        Ok(table.as_slice().to_vec().into_pyarray(py))
    }

    /// Returns the raw DNL histogram as a (128, 258) array.
    fn dnl_table<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<u32>> {
        let rows = self.inner.dnl_histogram().rows();
        let width = rows.first().map_or(0, |r| r.len());
        let flat: Vec<u32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        flat.into_pyarray(py).reshape([rows.len(), width])
    }

    /// Time of a hit code in nanoseconds, using the hit's channel table.
    #[pyo3(signature = (hitcode, interpolation="none"))]
    fn time(&mut self, hitcode: u32, interpolation: &str) -> PyResult<f64> {
        let interpolation = parse_interpolation(interpolation)?;
        Ok(self.inner.time(HitCode(hitcode), interpolation))
    }

    /// Channel of a hit code.
    fn channel(&self, hitcode: u32) -> u8 {
        decode_channel(HitCode(hitcode))
    }

    /// Wrap-corrected event number.
    fn extended_event_nr(&mut self, event_nr: i32) -> i64 {
        self.inner.extended_event_nr(event_nr)
    }

    /// Wrap-corrected trigger-request number.
    fn extended_trigger_request_nr(&mut self, trigger_request: i32) -> i64 {
        self.inner.extended_trigger_request_nr(trigger_request)
    }

    /// Returns all diagnostic counters as a dictionary.
    fn counters(&self, py: Python<'_>) -> PyResult<PyObject> {
        let c = self.inner.counters();
        let dict = PyDict::new(py);
        dict.set_item("trigger_during_busy", c.trigger_during_busy)?;
        dict.set_item("data_fifo_overflow", c.data_fifo_overflow)?;
        dict.set_item("old_tdc_data_ignored", c.old_tdc_data_ignored)?;
        dict.set_item("time_over_the_limit", c.time_over_the_limit)?;
        dict.set_item("hits_per_event_overflow", c.hits_per_event_overflow)?;
        dict.set_item("event_counter", c.event_counter)?;
        dict.set_item("hit_counter", c.hit_counter)?;
        dict.set_item("truncated_frames", c.truncated_frames)?;
        Ok(dict.into())
    }

    /// Clears the DNL histogram and calibration tables.
    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// VFB6 unpacker module for Python.
#[pymodule]
fn vfb6(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyDecoder>()?;
    m.add_class::<Events>()?;
    Ok(())
}
