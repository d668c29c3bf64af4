//! Reading data types and storage.
//!
//! Core data types for decoded temperature readings, the bounded
//! in-memory history, and summary statistics.

pub mod reading;
pub mod stats;
pub mod store;

pub use reading::Reading;
pub use stats::{ReadingStats, Trend};
pub use store::{ReadingStore, DEFAULT_CAPACITY, DEFAULT_RETENTION_DAYS};
