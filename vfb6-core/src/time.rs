//! Channel and time decoding of finalized hit codes.

use crate::calibration::CalibrationTable;
use crate::types::{HitCode, TimeInterpolation, CLOCK_PERIOD_NS};
use rand::Rng;

/// Source of uniformly distributed samples for random interpolation.
pub trait UniformSource {
    /// Returns a sample from `[low, high)`, or `low` when the range is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<R: Rng + ?Sized> UniformSource for R {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Extracts the channel of a hit code.
#[inline]
pub fn decode_channel(hit: HitCode) -> u8 {
    hit.channel()
}

/// Converts a hit code into a time in nanoseconds.
///
/// `rng` is only consulted for [`TimeInterpolation::Random`].
pub fn decode_time<U: UniformSource + ?Sized>(
    hit: HitCode,
    table: &CalibrationTable,
    interpolation: TimeInterpolation,
    rng: &mut U,
) -> f64 {
    let fine = hit.fine_time();
    let mut time = f64::from(hit.coarse_clock());

    // fine <= 127, so fine + 1 hits at most the guard entry
    match interpolation {
        TimeInterpolation::None => time += table[fine],
        TimeInterpolation::Linear => time += 0.5 * (table[fine] + table[fine + 1]),
        TimeInterpolation::Random => time += rng.uniform(table[fine], table[fine + 1]),
    }

    time * CLOCK_PERIOD_NS
}

/// Decodes channel and time in one call.
pub fn decode_time_and_channel<U: UniformSource + ?Sized>(
    hit: HitCode,
    table: &CalibrationTable,
    interpolation: TimeInterpolation,
    rng: &mut U,
) -> (u8, f64) {
    (
        decode_channel(hit),
        decode_time(hit, table, interpolation, rng),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::N_TIME_BINS;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Returns the point at a fixed fraction of the range.
    struct Fixed(f64);

    impl UniformSource for Fixed {
        fn uniform(&mut self, low: f64, high: f64) -> f64 {
            low + self.0 * (high - low)
        }
    }

    fn linear_table() -> CalibrationTable {
        let mut values = [0.0; N_TIME_BINS];
        for (j, v) in values.iter_mut().enumerate() {
            *v = j as f64 / 128.0;
        }
        CalibrationTable::from_values(values)
    }

    #[test]
    fn test_decode_channel() {
        let hit = HitCode::pack(77, 12, 3);
        assert_eq!(decode_channel(hit), 77);
    }

    #[test]
    fn test_decode_time_none() {
        let table = linear_table();
        // clock 10, fine 64 -> coarse 20, index 64
        let hit = HitCode::pack(1, 10, 64);
        let t = decode_time(hit, &table, TimeInterpolation::None, &mut Fixed(0.0));
        assert_relative_eq!(t, (20.0 + 0.5) * 2.5);
    }

    #[test]
    fn test_decode_time_linear() {
        let table = linear_table();
        let hit = HitCode::pack(1, 10, 0);
        let t = decode_time(hit, &table, TimeInterpolation::Linear, &mut Fixed(0.0));
        assert_relative_eq!(t, (20.0 + 0.5 / 128.0) * 2.5);
    }

    #[test]
    fn test_decode_time_random_uses_source() {
        let table = linear_table();
        let hit = HitCode::pack(1, 0, 127);
        let t = decode_time(hit, &table, TimeInterpolation::Random, &mut Fixed(0.5));
        assert_relative_eq!(t, (127.5 / 128.0) * 2.5);
    }

    #[test]
    fn test_decode_time_random_stays_in_bin() {
        let table = linear_table();
        let mut rng = StdRng::seed_from_u64(7);
        let hit = HitCode::pack(5, 3, 10);
        for _ in 0..1000 {
            let t = decode_time(hit, &table, TimeInterpolation::Random, &mut rng);
            let low = (6.0 + 10.0 / 128.0) * 2.5;
            let high = (6.0 + 11.0 / 128.0) * 2.5;
            assert!(t >= low && t <= high, "{} outside [{}, {}]", t, low, high);
        }
    }

    #[test]
    fn test_random_on_empty_bin_returns_edge() {
        let table = CalibrationTable::default();
        let mut rng = StdRng::seed_from_u64(1);
        let hit = HitCode::pack(0, 4, 0);
        let t = decode_time(hit, &table, TimeInterpolation::Random, &mut rng);
        assert_relative_eq!(t, 8.0 * 2.5);
    }

    #[test]
    fn test_decode_time_and_channel() {
        let table = CalibrationTable::default();
        let hit = HitCode::pack(33, 100, 0x80);
        let (ch, t) =
            decode_time_and_channel(hit, &table, TimeInterpolation::None, &mut Fixed(0.0));
        assert_eq!(ch, 33);
        assert_relative_eq!(t, 201.0 * 2.5);
    }
}
