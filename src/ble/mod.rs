//! BLE communication module.
//!
//! Low-level Bluetooth Low Energy functionality for discovering the
//! temperature sensor and pumping central events to the supervisor.

pub mod scanner;
pub mod uuids;

pub use scanner::{BleScanner, ScannerEvent, SensorDiscoveryEvent};
pub use uuids::*;
