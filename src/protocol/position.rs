//! Body sensor location decoding.
//!
//! The position characteristic is read once after connecting; its first
//! byte is the standard body-sensor-location enumeration.

/// Mounting position reported by the position characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SensorPosition {
    /// Other or unspecified.
    #[default]
    Other = 0,
    /// Chest mount.
    Chest = 1,
    /// Wrist mount.
    Wrist = 2,
    /// Finger mount.
    Finger = 3,
    /// Hand mount.
    Hand = 4,
    /// Ear lobe mount.
    EarLobe = 5,
    /// Foot mount.
    Foot = 6,
}

impl SensorPosition {
    /// Create from a raw byte value.
    ///
    /// Reserved values fall back to [`Self::Other`].
    pub fn from_raw(value: u8) -> Self {
        match value {
            1 => Self::Chest,
            2 => Self::Wrist,
            3 => Self::Finger,
            4 => Self::Hand,
            5 => Self::EarLobe,
            6 => Self::Foot,
            _ => Self::Other,
        }
    }

    /// Decode from a characteristic read; empty payloads yield `None`.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        payload.first().map(|byte| Self::from_raw(*byte))
    }

    /// Human-readable name for this position.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Other => "Other",
            Self::Chest => "Chest",
            Self::Wrist => "Wrist",
            Self::Finger => "Finger",
            Self::Hand => "Hand",
            Self::EarLobe => "Ear Lobe",
            Self::Foot => "Foot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(SensorPosition::from_raw(0), SensorPosition::Other);
        assert_eq!(SensorPosition::from_raw(1), SensorPosition::Chest);
        assert_eq!(SensorPosition::from_raw(6), SensorPosition::Foot);
        // Reserved values fall back to Other
        assert_eq!(SensorPosition::from_raw(7), SensorPosition::Other);
        assert_eq!(SensorPosition::from_raw(0xFF), SensorPosition::Other);
    }

    #[test]
    fn test_decode() {
        assert_eq!(SensorPosition::decode(&[2]), Some(SensorPosition::Wrist));
        assert_eq!(
            SensorPosition::decode(&[3, 0xAA]),
            Some(SensorPosition::Finger)
        );
        assert_eq!(SensorPosition::decode(&[]), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(SensorPosition::Chest.name(), "Chest");
        assert_eq!(SensorPosition::EarLobe.name(), "Ear Lobe");
    }
}
