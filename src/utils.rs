//! Utility functions for the kelvyn-ble crate.

/// Gauge display range in degrees Celsius.
pub const CELSIUS_RANGE: (f64, f64) = (-10.0, 50.0);

/// Gauge display range in degrees Fahrenheit.
pub const FAHRENHEIT_RANGE: (f64, f64) = (14.0, 122.0);

/// Convert Celsius to Fahrenheit.
///
/// # Example
///
/// ```
/// use kelvyn_ble::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
///
/// # Example
///
/// ```
/// use kelvyn_ble::fahrenheit_to_celsius;
///
/// let celsius = fahrenheit_to_celsius(212.0);
/// assert!((celsius - 100.0).abs() < 0.001);
/// ```
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Gauge display range for the selected unit.
pub fn display_range(fahrenheit: bool) -> (f64, f64) {
    if fahrenheit {
        FAHRENHEIT_RANGE
    } else {
        CELSIUS_RANGE
    }
}
