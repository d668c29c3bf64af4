//! Measurement notification decoding.
//!
//! The sensor reuses the Heart Rate Measurement payload layout but byte 1
//! carries an unsigned Fahrenheit temperature instead of a heart rate.
//! The layout is fixed: no checksum, no version field.

use crate::utils::fahrenheit_to_celsius;

/// Minimum length of a decodable measurement payload.
pub const MIN_PAYLOAD_LEN: usize = 2;

/// Humidity reported with every reading; the sensor does not measure it.
pub const PLACEHOLDER_HUMIDITY: f64 = 45.0;

/// A decoded measurement notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Flags byte; carried but not interpreted.
    pub flags: u8,
    /// Temperature as transmitted, in whole degrees Fahrenheit.
    pub fahrenheit: u8,
}

impl Measurement {
    /// Decode a notification payload.
    ///
    /// Payloads shorter than two bytes are dropped (`None`). Trailing
    /// bytes beyond the first two are ignored.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < MIN_PAYLOAD_LEN {
            return None;
        }

        Some(Self {
            flags: payload[0],
            fahrenheit: payload[1],
        })
    }

    /// Temperature in degrees Celsius.
    pub fn celsius(&self) -> f64 {
        fahrenheit_to_celsius(f64::from(self.fahrenheit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_splits_flags_and_value() {
        let measurement = Measurement::decode(&[0x0E, 0x68]).expect("valid payload");
        assert_eq!(measurement.flags, 0x0E);
        assert_eq!(measurement.fahrenheit, 104);
        assert!((measurement.celsius() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_converts_to_celsius() {
        // 212°F boils, 32°F freezes
        let measurement = Measurement::decode(&[0x0E, 0xD4]).expect("valid payload");
        assert!((measurement.celsius() - 100.0).abs() < 1e-9);

        let measurement = Measurement::decode(&[0x00, 32]).expect("valid payload");
        assert!(measurement.celsius().abs() < 1e-9);
    }

    #[test]
    fn test_short_payloads_are_dropped() {
        assert!(Measurement::decode(&[]).is_none());
        assert!(Measurement::decode(&[0x0E]).is_none());
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let measurement = Measurement::decode(&[0x0E, 72, 0xDE, 0xAD]).expect("valid payload");
        assert_eq!(measurement.fahrenheit, 72);
    }

    proptest! {
        #[test]
        fn decodes_any_payload_of_two_or_more_bytes(
            payload in proptest::collection::vec(any::<u8>(), 2..20)
        ) {
            let measurement = Measurement::decode(&payload).expect("payload long enough");
            let expected = (f64::from(payload[1]) - 32.0) * 5.0 / 9.0;
            prop_assert!((measurement.celsius() - expected).abs() < 1e-9);
        }

        #[test]
        fn drops_any_short_payload(
            payload in proptest::collection::vec(any::<u8>(), 0..2)
        ) {
            prop_assert!(Measurement::decode(&payload).is_none());
        }
    }
}
