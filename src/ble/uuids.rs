//! BLE Service and Characteristic UUIDs.
//!
//! The sensor borrows its identifiers from the standard Heart Rate
//! profile but carries vendor-specific payloads: byte 1 of a measurement
//! is an unsigned Fahrenheit temperature, not a heart rate.

use uuid::Uuid;

/// Heart Rate Service UUID (0x180D), advertised by the sensor.
pub const SENSOR_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_180d_0000_1000_8000_00805f9b34fb);

/// Heart Rate Measurement characteristic UUID (0x2A37).
///
/// Notify-only; every notification carries one temperature sample.
pub const MEASUREMENT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_00805f9b34fb);

/// Body Sensor Location characteristic UUID (0x2A38). Read once after connect.
pub const POSITION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_2a38_0000_1000_8000_00805f9b34fb);

/// Advertised-name fragments that identify the sensor hardware.
pub const SENSOR_NAME_FRAGMENTS: [&str; 3] = ["Kelvyn", "KelvynTemp", "FT7"];

/// Check if a service UUID is the sensor's measurement service.
pub fn is_sensor_service(uuid: &Uuid) -> bool {
    *uuid == SENSOR_SERVICE_UUID
}

/// Check if an advertised local name identifies the sensor.
pub fn matches_sensor_name(name: &str) -> bool {
    SENSOR_NAME_FRAGMENTS
        .iter()
        .any(|fragment| name.contains(fragment))
}
