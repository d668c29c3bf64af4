//! Temperature reading records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::celsius_to_fahrenheit;

/// A single decoded temperature reading.
///
/// Immutable once created; the decoder produces one per valid
/// measurement notification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Unique id for this reading.
    pub id: Uuid,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent (currently a fixed placeholder).
    pub humidity: f64,
    /// When the reading was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self::at(temperature, humidity, Utc::now())
    }

    /// Create a reading with an explicit timestamp.
    pub fn at(temperature: f64, humidity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            temperature,
            humidity,
            timestamp,
        }
    }

    /// Temperature in degrees Fahrenheit.
    pub fn fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now();
        let reading = Reading::new(21.5, 45.0);
        let after = Utc::now();

        assert!(reading.timestamp >= before);
        assert!(reading.timestamp <= after);
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 45.0);
    }

    #[test]
    fn test_at_uses_explicit_timestamp() {
        let timestamp = Utc::now() - Duration::hours(3);
        let reading = Reading::at(18.0, 45.0, timestamp);

        assert_eq!(reading.timestamp, timestamp);
    }

    #[test]
    fn test_readings_get_distinct_ids() {
        let a = Reading::new(20.0, 45.0);
        let b = Reading::new(20.0, 45.0);

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_fahrenheit() {
        let reading = Reading::new(100.0, 45.0);
        assert!((reading.fahrenheit() - 212.0).abs() < 0.001);
    }
}
