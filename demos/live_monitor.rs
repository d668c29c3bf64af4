//! Live temperature monitoring example
//!
//! Run with: cargo run --example live_monitor

use kelvyn_ble::{celsius_to_fahrenheit, ReadingStore, Result, SensorManager, Trend};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt().with_env_filter("warn").init();

    println!("Temperature Monitor");
    println!("==================\n");
    println!("Looking for the sensor...\n");

    let store = Arc::new(ReadingStore::new());
    let manager = SensorManager::new(store.clone()).await?;

    manager.start_scanning()?;

    println!("Scanning started. Press Ctrl+C to exit.\n");

    // Monitor loop
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n\nExiting...");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                display(&manager, &store);
            }
        }
    }

    manager.disconnect()?;
    manager.shutdown().await?;

    Ok(())
}

fn display(manager: &SensorManager, store: &ReadingStore) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    let status = manager.status();

    println!("=== Temperature Monitor ===");
    println!("Status: {}", status.message);
    println!("Link:   {:?}\n", manager.link_state());

    if let Some(reading) = store.latest() {
        println!(
            "Current: {:6.1}°C ({:6.1}°F)",
            reading.temperature,
            celsius_to_fahrenheit(reading.temperature)
        );
        println!("Humidity: {:5.1}%", reading.humidity);
        println!("Updated:  {}", reading.timestamp.format("%H:%M:%S"));
    } else {
        println!("Current: -- (no readings yet)");
    }

    let today = store.today();
    if !today.is_empty() {
        let stats = store.stats();
        let arrow = match stats.trend {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
        };

        println!("\nToday ({} readings):", today.len());
        println!("--------------------");
        println!("  Min:     {:6.1}°C", stats.min);
        println!("  Max:     {:6.1}°C", stats.max);
        println!("  Average: {:6.1}°C", stats.average);
        println!("  Trend:   {}", arrow);
    }

    if let Some(position) = manager.sensor_position() {
        println!("\nSensor position: {}", position.name());
    }

    println!("\nPress Ctrl+C to exit");
    let _ = std::io::stdout().flush();
}
