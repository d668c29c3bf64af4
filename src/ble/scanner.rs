//! BLE scanning functionality.
//!
//! Provides adapter access, scan control, and the central event pump that
//! feeds discovery and radio-state events to the sensor manager.

use btleplug::api::{Central, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::ble::uuids::{matches_sensor_name, SENSOR_SERVICE_UUID};
use crate::error::{Error, Result};
use crate::link::RadioState;

/// Event emitted when a peripheral is discovered or updated.
#[derive(Debug, Clone)]
pub struct SensorDiscoveryEvent {
    /// The BLE peripheral identifier.
    pub identifier: String,
    /// The peripheral handle.
    pub peripheral: Peripheral,
    /// Advertised local name (if any).
    pub local_name: Option<String>,
    /// Whether the advertised name matched a known sensor name.
    pub matches_name: bool,
    /// Whether the advertisement carried the sensor's service UUID.
    pub advertises_service: bool,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl SensorDiscoveryEvent {
    /// First-match-wins target filter: known name fragment or advertised
    /// sensor service.
    pub fn is_sensor(&self) -> bool {
        self.matches_name || self.advertises_service
    }
}

/// Event from the central adapter.
#[derive(Debug, Clone)]
pub enum ScannerEvent {
    /// A peripheral was discovered or its advertisement updated.
    Discovered(SensorDiscoveryEvent),
    /// A peripheral connected, identified by its BLE identifier.
    Connected(String),
    /// A peripheral disconnected, identified by its BLE identifier.
    Disconnected(String),
    /// The adapter reported a power state change.
    RadioState(RadioState),
}

/// BLE scanner for discovering the temperature sensor.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
    /// Whether scanning is currently active.
    is_scanning: Arc<RwLock<bool>>,
    /// Whether the event pump is running.
    is_running: Arc<AtomicBool>,
    /// Channel for adapter events.
    event_tx: broadcast::Sender<ScannerEvent>,
    /// Handle to the event pump task.
    pump_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl BleScanner {
    /// Create a new BLE scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            adapter,
            is_scanning: Arc::new(RwLock::new(false)),
            is_running: Arc::new(AtomicBool::new(false)),
            event_tx,
            pump_handle: RwLock::new(None),
        }
    }

    /// Start pumping central events to subscribers.
    ///
    /// Runs until [`shutdown`](Self::shutdown); idempotent. Discovery,
    /// connection, and radio-state events all flow through the same pump so
    /// subscribers see them in adapter order.
    pub async fn start_events(&self) -> Result<()> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            debug!("Event pump already running");
            return Ok(());
        }

        let mut events = self.adapter.events().await.map_err(Error::Bluetooth)?;

        let adapter = self.adapter.clone();
        let is_running = self.is_running.clone();
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            while is_running.load(Ordering::SeqCst) {
                tokio::select! {
                    Some(event) = events.next() => {
                        Self::handle_event(event, &adapter, &event_tx).await;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        // Check if we should stop pumping
                        if !is_running.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                }
            }

            debug!("Central event pump ended");
        });

        *self.pump_handle.write() = Some(handle);

        Ok(())
    }

    /// Start scanning for the sensor.
    ///
    /// The scan runs unfiltered; candidates are matched per advertisement
    /// by name fragment or advertised service UUID.
    pub async fn start_scanning(&self) -> Result<()> {
        if *self.is_scanning.read() {
            debug!("Already scanning, ignoring start request");
            return Ok(());
        }

        info!("Starting BLE scan for the temperature sensor");

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        *self.is_scanning.write() = true;

        Ok(())
    }

    /// Stop scanning; idempotent.
    pub async fn stop_scanning(&self) -> Result<()> {
        if !*self.is_scanning.read() {
            debug!("Not scanning, ignoring stop request");
            return Ok(());
        }

        info!("Stopping BLE scan");

        *self.is_scanning.write() = false;

        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        Ok(())
    }

    /// Check if currently scanning.
    pub fn is_scanning(&self) -> bool {
        *self.is_scanning.read()
    }

    /// Subscribe to adapter events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Stop the event pump and any active scan.
    pub async fn shutdown(&self) {
        self.is_running.store(false, Ordering::SeqCst);

        if let Err(e) = self.stop_scanning().await {
            warn!("Failed to stop scan during shutdown: {}", e);
        }

        if let Some(handle) = self.pump_handle.write().take() {
            let _ = handle.await;
        }
    }

    /// Handle a BLE central event.
    async fn handle_event(
        event: btleplug::api::CentralEvent,
        adapter: &Adapter,
        event_tx: &broadcast::Sender<ScannerEvent>,
    ) {
        use btleplug::api::CentralEvent;

        match event {
            CentralEvent::DeviceDiscovered(id) => {
                trace!("Device discovered: {:?}", id);
                Self::process_peripheral(adapter, id, event_tx).await;
            }
            CentralEvent::DeviceUpdated(id) => {
                trace!("Device updated: {:?}", id);
                Self::process_peripheral(adapter, id, event_tx).await;
            }
            CentralEvent::DeviceConnected(id) => {
                debug!("Device connected: {:?}", id);
                let _ = event_tx.send(ScannerEvent::Connected(id.to_string()));
            }
            CentralEvent::DeviceDisconnected(id) => {
                debug!("Device disconnected: {:?}", id);
                let _ = event_tx.send(ScannerEvent::Disconnected(id.to_string()));
            }
            CentralEvent::StateUpdate(state) => {
                let radio = match state {
                    CentralState::PoweredOn => RadioState::PoweredOn,
                    CentralState::PoweredOff => RadioState::PoweredOff,
                    _ => RadioState::Unknown,
                };
                debug!("Adapter state update: {:?}", radio);
                let _ = event_tx.send(ScannerEvent::RadioState(radio));
            }
            CentralEvent::ManufacturerDataAdvertisement { .. } => {}
            CentralEvent::ServiceDataAdvertisement { .. } => {}
            CentralEvent::ServicesAdvertisement { .. } => {}
        }
    }

    /// Process a discovered peripheral into a discovery event.
    async fn process_peripheral(
        adapter: &Adapter,
        id: btleplug::platform::PeripheralId,
        event_tx: &broadcast::Sender<ScannerEvent>,
    ) {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let local_name = properties.local_name.clone();
        let matches_name = local_name
            .as_deref()
            .map(matches_sensor_name)
            .unwrap_or(false);
        let advertises_service = properties.services.contains(&SENSOR_SERVICE_UUID);

        let event = SensorDiscoveryEvent {
            identifier: id.to_string(),
            peripheral,
            local_name,
            matches_name,
            advertises_service,
            rssi: properties.rssi,
        };

        if event.is_sensor() {
            debug!(
                "Candidate sensor discovered: {:?} (rssi: {:?})",
                event.local_name, event.rssi
            );
        }

        let _ = event_tx.send(ScannerEvent::Discovered(event));
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        *self.is_scanning.write() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_event_clone() {
        // Just verify the event types are Clone
        fn assert_clone<T: Clone>() {}
        assert_clone::<SensorDiscoveryEvent>();
        assert_clone::<ScannerEvent>();
    }
}
