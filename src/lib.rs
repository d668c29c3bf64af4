// Allow holding locks across await points - we use parking_lot which is designed for this
#![allow(clippy::await_holding_lock)]

//! # kelvyn-ble
//!
//! A cross-platform Rust client for the Kelvyn ESP32 temperature sensor,
//! built on Bluetooth Low Energy.
//!
//! The sensor advertises as a standard Heart Rate Monitor but carries
//! vendor-specific payloads: byte 1 of each measurement notification is an
//! unsigned Fahrenheit temperature. The sensor also powers down between
//! readings, so the heart of this crate is the connection supervisor that
//! discovers, connects, subscribes, and automatically reconnects across
//! radio outages and device sleep cycles.
//!
//! ## Features
//!
//! - **Discovery**: Find the sensor by advertised name or service UUID
//! - **Connection supervision**: Explicit state machine with bounded,
//!   timer-driven reconnection (5 s interval, 100-attempt ceiling)
//! - **Measurement decoding**: Fahrenheit payloads converted to Celsius
//! - **Reading history**: Bounded in-memory store with calendar-range
//!   queries and summary statistics
//! - **Status reporting**: Human-readable status line plus connected flag,
//!   broadcast to any number of subscribers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kelvyn_ble::{ReadingStore, Result, SensorManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = Arc::new(ReadingStore::new());
//!     let manager = SensorManager::new(store.clone()).await?;
//!
//!     manager.start_scanning()?;
//!
//!     let mut readings = manager.subscribe_readings();
//!     for _ in 0..5 {
//!         if let Ok(reading) = readings.recv().await {
//!             println!("{:.1}°C at {}", reading.temperature, reading.timestamp);
//!         }
//!     }
//!
//!     println!("{} readings today", store.today().len());
//!
//!     manager.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod data;
pub mod error;
pub mod link;
pub mod manager;
pub mod protocol;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};
pub use manager::{CallbackHandle, SensorManager, StatusUpdate};
pub use utils::{celsius_to_fahrenheit, display_range, fahrenheit_to_celsius};

// Re-export commonly used types from submodules
pub use data::{Reading, ReadingStats, ReadingStore, Trend};
pub use link::{LinkState, LinkStatus};
pub use protocol::{Measurement, SensorPosition};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<SensorManager>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<Reading>();
        let _ = std::any::TypeId::of::<ReadingStore>();
        let _ = std::any::TypeId::of::<ReadingStats>();
        let _ = std::any::TypeId::of::<LinkState>();
        let _ = std::any::TypeId::of::<Measurement>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }
}
