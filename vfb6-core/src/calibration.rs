//! Differential non-linearity histogram and calibration tables.
//!
//! Under uniformly distributed input every fine time code should be equally
//! likely. The DNL histogram counts how often each code was seen per channel
//! and integrating it yields the calibration curve that maps a fine time
//! code onto its fractional position inside the clock period.

use crate::types::{N_CHANNELS, N_DNL_BINS, N_TIME_BINS};
use std::ops::Index;

/// Seed count placed in bin 0 of every channel at construction.
const INITIAL_BIN0_COUNT: u32 = 10;

/// Per-channel histogram of observed fine time codes.
///
/// Each channel row holds two banks of [`N_TIME_BINS`] bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnlHistogram {
    bins: Vec<[u32; N_DNL_BINS]>,
}

impl Default for DnlHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl DnlHistogram {
    /// Creates a histogram with bin 0 of every channel seeded.
    pub fn new() -> Self {
        let mut row = [0u32; N_DNL_BINS];
        row[0] = INITIAL_BIN0_COUNT;
        Self {
            bins: vec![row; N_CHANNELS],
        }
    }

    /// Creates a histogram with every bin at zero.
    pub fn zeroed() -> Self {
        Self {
            bins: vec![[0u32; N_DNL_BINS]; N_CHANNELS],
        }
    }

    /// Counts one occurrence of `fine_time` on `channel`.
    ///
    /// Codes outside the table are ignored.
    #[inline]
    pub fn record(&mut self, channel: usize, fine_time: usize) {
        if let Some(bin) = self
            .bins
            .get_mut(channel)
            .and_then(|row| row.get_mut(fine_time))
        {
            *bin = bin.saturating_add(1);
        }
    }

    /// Adds `count` to a single bin. Used to load externally stored histograms.
    pub fn add(&mut self, channel: usize, bin: usize, count: u32) {
        if let Some(slot) = self.bins.get_mut(channel).and_then(|row| row.get_mut(bin)) {
            *slot = slot.saturating_add(count);
        }
    }

    /// Sets every bin of every channel to zero.
    pub fn clear(&mut self) {
        for row in &mut self.bins {
            row.fill(0);
        }
    }

    /// Returns the bins of one channel.
    pub fn row(&self, channel: usize) -> Option<&[u32; N_DNL_BINS]> {
        self.bins.get(channel)
    }

    /// Returns all channel rows.
    pub fn rows(&self) -> &[[u32; N_DNL_BINS]] {
        &self.bins
    }

    /// Sum of all bins of one channel (0 for an unknown channel).
    pub fn total(&self, channel: usize) -> u64 {
        self.row(channel)
            .map(|row| row.iter().map(|&c| u64::from(c)).sum())
            .unwrap_or(0)
    }

    /// Integrates one channel into a calibration table.
    pub fn calibration(&self, channel: usize) -> CalibrationTable {
        self.row(channel)
            .map(CalibrationTable::from_histogram_row)
            .unwrap_or_default()
    }
}

/// Normalized cumulative fine-time distribution of one channel.
///
/// Entry `j` is the fraction of samples below fine time code `j`, with both
/// histogram banks folded together. Values lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTable([f64; N_TIME_BINS]);

impl Default for CalibrationTable {
    fn default() -> Self {
        Self([0.0; N_TIME_BINS])
    }
}

impl CalibrationTable {
    /// Creates a table from explicit values.
    pub fn from_values(values: [f64; N_TIME_BINS]) -> Self {
        Self(values)
    }

    /// Integrates a histogram row.
    ///
    /// An empty row yields an all-zero table.
    pub fn from_histogram_row(row: &[u32; N_DNL_BINS]) -> Self {
        let total: u64 = row.iter().map(|&c| u64::from(c)).sum();
        let mut table = [0.0; N_TIME_BINS];
        if total == 0 {
            return Self(table);
        }

        let total = total as f64;
        let mut low_bank = 0u64;
        let mut high_bank = 0u64;
        for (j, entry) in table.iter_mut().enumerate() {
            *entry = (low_bank + high_bank) as f64 / total;
            low_bank += u64::from(row[j]);
            high_bank += u64::from(row[N_TIME_BINS - 1 + j]);
        }

        Self(table)
    }

    /// Returns the table entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns the table entries as a fixed-size array.
    pub fn values(&self) -> &[f64; N_TIME_BINS] {
        &self.0
    }

    /// Returns true when no calibration data contributed to the table.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }
}

impl Index<usize> for CalibrationTable {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_histogram_seeds_bin0() {
        let hist = DnlHistogram::new();
        for ch in 0..N_CHANNELS {
            let row = hist.row(ch).unwrap();
            assert_eq!(row[0], 10);
            assert!(row[1..].iter().all(|&c| c == 0));
        }
        assert!(hist.row(N_CHANNELS).is_none());
    }

    #[test]
    fn test_record_and_clear() {
        let mut hist = DnlHistogram::zeroed();
        hist.record(3, 200);
        hist.record(3, 200);
        hist.record(200, 1); // ignored
        hist.record(3, N_DNL_BINS); // ignored
        assert_eq!(hist.row(3).unwrap()[200], 2);
        assert_eq!(hist.total(3), 2);

        hist.clear();
        assert_eq!(hist.total(3), 0);
    }

    #[test]
    fn test_zero_histogram_gives_zero_table() {
        let hist = DnlHistogram::zeroed();
        for ch in 0..N_CHANNELS {
            assert!(hist.calibration(ch).is_zero());
        }
        assert!(hist.calibration(N_CHANNELS + 5).is_zero());
    }

    #[test]
    fn test_seed_only_channel() {
        // only the bin-0 seed: everything above entry 0 is the full fraction
        let table = DnlHistogram::new().calibration(0);
        assert_eq!(table[0], 0.0);
        assert_relative_eq!(table[1], 1.0);
        assert_relative_eq!(table[128], 1.0);
    }

    #[test]
    fn test_banks_are_folded() {
        let mut hist = DnlHistogram::zeroed();
        hist.add(1, 0, 1);
        hist.add(1, 1, 1);
        hist.add(1, 128, 1);
        hist.add(1, 129, 1);

        let table = hist.calibration(1);
        assert_relative_eq!(table[0], 0.0);
        // j=1: bins[0..1] + bins[128..129] = 2 of 4
        assert_relative_eq!(table[1], 0.5);
        assert_relative_eq!(table[2], 1.0);
        assert_relative_eq!(table[128], 1.0);
    }

    #[test]
    fn test_uniform_histogram_is_linear() {
        let mut hist = DnlHistogram::zeroed();
        for bin in 0..256 {
            hist.add(0, bin, 4);
        }

        let table = hist.calibration(0);
        for j in 0..N_TIME_BINS {
            assert_relative_eq!(table[j], j as f64 / 128.0, epsilon = 1e-12);
        }
        assert!(table.as_slice().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_last_bins_excluded_from_integration() {
        let mut hist = DnlHistogram::zeroed();
        hist.add(0, 0, 1);
        hist.add(0, 257, 1);

        let table = hist.calibration(0);
        assert_relative_eq!(table[128], 0.5);
    }
}
