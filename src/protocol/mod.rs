//! Payload decoding for the sensor's vendor-specific protocol.
//!
//! The sensor speaks the Heart Rate profile on the wire but fills the
//! fields with its own semantics; these types recover the temperature
//! readings and the one-time position value.

pub mod measurement;
pub mod position;

pub use measurement::{Measurement, MIN_PAYLOAD_LEN, PLACEHOLDER_HUMIDITY};
pub use position::SensorPosition;
