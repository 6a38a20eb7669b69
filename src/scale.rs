//! Scale bar rendering.
//!
//! A reading is drawn as ten glyphs: `💨` for each filled segment, `🌱` for
//! each empty one. The clamped value is multiplied by 100 before its position
//! in the range is taken, so the bar saturates for all but very small
//! readings.

use crate::catalog::{Pollutant, ValidRange};

pub const BAR_SEGMENTS: usize = 10;
pub const FILLED_GLYPH: &str = "💨";
pub const EMPTY_GLYPH: &str = "🌱";

const SCALE_FACTOR: f64 = 100.0;

/// Number of filled segments for `value` within `range`, always in `0..=10`.
pub fn bar_length(value: f64, range: ValidRange) -> usize {
    if value.is_nan() {
        return 0;
    }

    let scaled = range.clamp(value) * SCALE_FACTOR;
    let proportion = (scaled - range.min) / (range.max - range.min);
    let length = (proportion * BAR_SEGMENTS as f64).floor();

    // Unclamped, this goes negative for ranges reaching below zero and
    // far past 10 for nearly every real reading.
    length.clamp(0.0, BAR_SEGMENTS as f64) as usize
}

/// Renders the scale bar for a reading of `pollutant`.
pub fn scale_bar(value: f64, pollutant: &Pollutant) -> String {
    let filled = bar_length(value, pollutant.valid_range);
    format!(
        "{}{}",
        FILLED_GLYPH.repeat(filled),
        EMPTY_GLYPH.repeat(BAR_SEGMENTS - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, POLLUTANT_REGISTRY};

    fn pm10() -> &'static Pollutant {
        catalog::lookup(1).unwrap()
    }

    fn filled_in(bar: &str) -> usize {
        bar.matches(FILLED_GLYPH).count()
    }

    #[test]
    fn test_zero_reading_is_empty_bar() {
        assert_eq!(scale_bar(0.0, pm10()), EMPTY_GLYPH.repeat(10));
    }

    #[test]
    fn test_typical_reading_saturates() {
        // 42.5 * 100 = 4250, far beyond max = 100.
        assert_eq!(scale_bar(42.5, pm10()), FILLED_GLYPH.repeat(10));
    }

    #[test]
    fn test_small_reading_is_proportional_after_scaling() {
        // 0.5 * 100 = 50 -> half of [0, 100].
        assert_eq!(bar_length(0.5, pm10().valid_range), 5);
        // 0.05 * 100 = 5 -> 0.5 segments, floored.
        assert_eq!(bar_length(0.05, pm10().valid_range), 0);
        // 0.19 * 100 = 19 -> 1.9 segments.
        assert_eq!(bar_length(0.19, pm10().valid_range), 1);
    }

    #[test]
    fn test_negative_reading_clamps_to_min() {
        assert_eq!(bar_length(-12.0, pm10().valid_range), 0);
    }

    #[test]
    fn test_reading_above_max_clamps_to_full() {
        assert_eq!(bar_length(10_000.0, pm10().valid_range), 10);
    }

    #[test]
    fn test_negative_range_clamps_bar_to_zero() {
        // clamp(-10) * 100 = -1000; (-1000 + 10) / 20 * 10 = -495.
        let r = ValidRange { min: -10.0, max: 10.0 };
        assert_eq!(bar_length(-10.0, r), 0);
        assert_eq!(bar_length(-50.0, r), 0);
    }

    #[test]
    fn test_positive_min_below_range_saturates() {
        // clamp(5) = 10, scaled = 1000; (1000 - 10) / 10 * 10 = 990.
        assert_eq!(bar_length(5.0, ValidRange { min: 10.0, max: 20.0 }), 10);
    }

    #[test]
    fn test_nan_is_empty_bar() {
        assert_eq!(bar_length(f64::NAN, pm10().valid_range), 0);
    }

    #[test]
    fn test_bar_always_has_ten_segments() {
        let samples = [-1e9, -1.0, 0.0, 0.001, 0.01, 0.2, 0.37, 1.0, 7.5, 99.9, 1e9];
        for p in POLLUTANT_REGISTRY {
            for &v in &samples {
                let bar = scale_bar(v, p);
                let filled = filled_in(&bar);
                let empty = bar.matches(EMPTY_GLYPH).count();
                assert!(filled <= BAR_SEGMENTS, "{} at {}: {} filled", p.code, v, filled);
                assert_eq!(filled + empty, BAR_SEGMENTS, "{} at {}", p.code, v);
            }
        }
    }

    #[test]
    fn test_bar_is_monotonic_in_value() {
        let r = pm10().valid_range;
        let mut last = 0;
        for step in 0..=200 {
            let len = bar_length(step as f64 * 0.01, r);
            assert!(len >= last, "bar shrank at {}", step as f64 * 0.01);
            last = len;
        }
        assert_eq!(last, 10);
    }
}
