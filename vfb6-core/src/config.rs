//! Decoder configuration.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! window_size_clocks = 200
//! return_events_with_no_hits = true
//! ```

use crate::types::{TimeInterpolation, DEFAULT_WINDOW_SIZE_CLOCKS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Parameters of the event parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Trigger window in TDC clocks; clock words at or above it are rejected
    pub window_size_clocks: u32,
    /// Keep events that ended up without finalized hits
    pub return_events_with_no_hits: bool,
    /// Interpolation used when converting hits to nanoseconds
    pub interpolation: TimeInterpolation,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            window_size_clocks: DEFAULT_WINDOW_SIZE_CLOCKS,
            return_events_with_no_hits: false,
            interpolation: TimeInterpolation::None,
        }
    }
}

impl DecoderConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size_clocks == 0 {
            return Err(ConfigError::InvalidValue(
                "window_size_clocks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the trigger window.
    pub fn with_window_size_clocks(mut self, clocks: u32) -> Self {
        self.window_size_clocks = clocks;
        self
    }

    /// Sets whether events without hits are returned.
    pub fn with_empty_events(mut self, keep: bool) -> Self {
        self.return_events_with_no_hits = keep;
        self
    }

    /// Sets the time interpolation.
    pub fn with_interpolation(mut self, interpolation: TimeInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}
