//! Reading statistics.

use super::reading::Reading;

/// Number of trailing readings examined for the trend.
const TREND_WINDOW: usize = 5;

/// Temperature change below this is considered stable, in °C.
const TREND_THRESHOLD: f64 = 0.5;

/// Direction the temperature is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trend {
    /// Temperature is rising.
    Rising,
    /// Temperature is falling.
    Falling,
    /// Temperature is holding steady.
    #[default]
    Stable,
}

/// Summary statistics over a set of readings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReadingStats {
    /// Most recent temperature, in °C.
    pub current: f64,
    /// Lowest temperature seen, in °C.
    pub min: f64,
    /// Highest temperature seen, in °C.
    pub max: f64,
    /// Mean temperature, in °C.
    pub average: f64,
    /// Direction over the last few readings.
    pub trend: Trend,
}

impl ReadingStats {
    /// Compute statistics from readings in any order.
    ///
    /// Empty input yields all-zero values and a stable trend.
    pub fn from_readings(readings: &[Reading]) -> Self {
        if readings.is_empty() {
            return Self::default();
        }

        let mut by_time: Vec<&Reading> = readings.iter().collect();
        by_time.sort_by_key(|reading| reading.timestamp);

        let temperatures: Vec<f64> = readings.iter().map(|r| r.temperature).collect();
        let current = by_time[by_time.len() - 1].temperature;
        let min = temperatures.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temperatures
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let average = temperatures.iter().sum::<f64>() / temperatures.len() as f64;

        let window = &by_time[by_time.len().saturating_sub(TREND_WINDOW)..];
        let trend = if window.len() >= 2 {
            let delta = window[window.len() - 1].temperature - window[0].temperature;
            if delta.abs() < TREND_THRESHOLD {
                Trend::Stable
            } else if delta > 0.0 {
                Trend::Rising
            } else {
                Trend::Falling
            }
        } else {
            Trend::Stable
        };

        Self {
            current,
            min,
            max,
            average,
            trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn series(temperatures: &[f64]) -> Vec<Reading> {
        let start = Utc::now() - Duration::minutes(temperatures.len() as i64);
        temperatures
            .iter()
            .enumerate()
            .map(|(i, &t)| Reading::at(t, 45.0, start + Duration::minutes(i as i64)))
            .collect()
    }

    #[test]
    fn test_empty_input_is_all_zero_and_stable() {
        let stats = ReadingStats::from_readings(&[]);
        assert_eq!(stats.current, 0.0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn test_basic_statistics() {
        let stats = ReadingStats::from_readings(&series(&[20.0, 22.0, 24.0]));
        assert_eq!(stats.current, 24.0);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 24.0);
        assert!((stats.average - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_rising_trend() {
        let stats = ReadingStats::from_readings(&series(&[20.0, 20.5, 21.0, 21.5, 22.0]));
        assert_eq!(stats.trend, Trend::Rising);
    }

    #[test]
    fn test_falling_trend() {
        let stats = ReadingStats::from_readings(&series(&[22.0, 21.5, 21.0, 20.5, 20.0]));
        assert_eq!(stats.trend, Trend::Falling);
    }

    #[test]
    fn test_small_drift_is_stable() {
        let stats = ReadingStats::from_readings(&series(&[20.0, 20.1, 20.2, 20.3, 20.4]));
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn test_trend_uses_trailing_window_only() {
        // Large early swing, flat tail
        let stats = ReadingStats::from_readings(&series(&[
            10.0, 30.0, 21.0, 21.0, 21.1, 21.1, 21.2,
        ]));
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn test_single_reading_is_stable() {
        let stats = ReadingStats::from_readings(&series(&[25.0]));
        assert_eq!(stats.current, 25.0);
        assert_eq!(stats.trend, Trend::Stable);
    }

    #[test]
    fn test_current_follows_timestamps_not_slice_order() {
        let now = Utc::now();
        let readings = vec![
            Reading::at(30.0, 45.0, now),
            Reading::at(10.0, 45.0, now - Duration::minutes(10)),
        ];

        let stats = ReadingStats::from_readings(&readings);
        assert_eq!(stats.current, 30.0);
    }
}
