//! Discovery debugging example
//!
//! Prints every advertisement and adapter event the scanner sees, marking
//! which peripherals match the sensor filter.
//!
//! Run with: cargo run --example scan_debug

use kelvyn_ble::ble::{BleScanner, ScannerEvent};
use kelvyn_ble::Result;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Scan Debug");
    println!("==========\n");

    let scanner = BleScanner::new().await?;
    scanner.start_events().await?;

    let mut events = scanner.subscribe();

    scanner.start_scanning().await?;
    println!("Scanning for 30 seconds...\n");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::signal::ctrl_c() => break,
            Ok(event) = events.recv() => match event {
                ScannerEvent::Discovered(discovery) => {
                    let marker = if discovery.is_sensor() { ">>" } else { "  " };
                    println!(
                        "{} {} name={:?} service={} rssi={:?}",
                        marker,
                        discovery.identifier,
                        discovery.local_name,
                        discovery.advertises_service,
                        discovery.rssi,
                    );
                }
                ScannerEvent::Connected(id) => println!("   connected: {}", id),
                ScannerEvent::Disconnected(id) => println!("   disconnected: {}", id),
                ScannerEvent::RadioState(state) => println!("   radio: {:?}", state),
            },
        }
    }

    scanner.shutdown().await;
    println!("\nDone.");

    Ok(())
}
