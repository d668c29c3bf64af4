//! Sensor manager: the runtime half of the connection supervisor.
//!
//! Funnels btleplug central events, timer firings, and caller intents into
//! a single serialized queue, drives the [`LinkMachine`], and executes the
//! commands it returns against the adapter. State transitions therefore
//! run to completion one event at a time; slow radio work (connects,
//! service discovery, subscribes) is spawned and reports back through the
//! same queue.

use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::ble::scanner::{BleScanner, ScannerEvent};
use crate::ble::uuids::{
    MEASUREMENT_CHARACTERISTIC_UUID, POSITION_CHARACTERISTIC_UUID, SENSOR_SERVICE_UUID,
};
use crate::data::{Reading, ReadingStore};
use crate::error::{Error, Result};
use crate::link::{
    Command, LinkEvent, LinkMachine, LinkState, LinkStatus, RadioState, TaskTimer,
    RETRY_INTERVAL, SCAN_TIMEOUT,
};
use crate::protocol::{Measurement, SensorPosition, PLACEHOLDER_HUMIDITY};

/// Connection status snapshot for UI consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Whether the sensor link is established.
    pub connected: bool,
    /// Human-readable status line.
    pub message: String,
}

/// Callback handle for unregistering callbacks.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// Mutable runtime state shared between the manager and its tasks.
struct Shared {
    /// The supervisor state machine.
    machine: Mutex<LinkMachine>,
    /// Last known device handle, kept for reconnection.
    peripheral: RwLock<Option<Peripheral>>,
    /// Cached measurement characteristic, valid while connected.
    measurement_char: RwLock<Option<btleplug::api::Characteristic>>,
    /// Cached position characteristic, valid while connected.
    position_char: RwLock<Option<btleplug::api::Characteristic>>,
    /// Last value read from the position characteristic.
    sensor_position: RwLock<Option<SensorPosition>>,
    /// Latest published status.
    status: RwLock<StatusUpdate>,
    /// Handle to the per-session notification listener task.
    notify_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

/// Everything the event loop needs, cloned into its task.
#[derive(Clone)]
struct Runtime {
    scanner: Arc<BleScanner>,
    store: Arc<ReadingStore>,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
    status_tx: broadcast::Sender<StatusUpdate>,
    reading_tx: broadcast::Sender<Reading>,
    retry_timer: Arc<TaskTimer>,
    scan_timer: Arc<TaskTimer>,
}

/// Supervises the link to one temperature sensor.
///
/// Owns discovery, connection, characteristic resolution, notification
/// subscription, disconnect detection, and bounded automatic reconnection.
/// Decoded readings land in the injected [`ReadingStore`] and are
/// broadcast to subscribers.
pub struct SensorManager {
    scanner: Arc<BleScanner>,
    store: Arc<ReadingStore>,
    shared: Arc<Shared>,
    event_tx: mpsc::UnboundedSender<LinkEvent>,
    status_tx: broadcast::Sender<StatusUpdate>,
    reading_tx: broadcast::Sender<Reading>,
    retry_timer: Arc<TaskTimer>,
    scan_timer: Arc<TaskTimer>,
    is_running: Arc<AtomicBool>,
    loop_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    pump_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    callback_counter: AtomicU64,
}

impl SensorManager {
    /// Create a manager using the first available Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new(store: Arc<ReadingStore>) -> Result<Self> {
        let scanner = Arc::new(BleScanner::new().await?);
        Self::with_scanner(scanner, store).await
    }

    /// Create a manager on top of an existing scanner.
    pub async fn with_scanner(scanner: Arc<BleScanner>, store: Arc<ReadingStore>) -> Result<Self> {
        scanner.start_events().await?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = broadcast::channel(32);
        let (reading_tx, _) = broadcast::channel(64);

        let shared = Arc::new(Shared {
            machine: Mutex::new(LinkMachine::new()),
            peripheral: RwLock::new(None),
            measurement_char: RwLock::new(None),
            position_char: RwLock::new(None),
            sensor_position: RwLock::new(None),
            status: RwLock::new(StatusUpdate {
                connected: false,
                message: LinkStatus::Disconnected.to_string(),
            }),
            notify_handle: RwLock::new(None),
        });

        let manager = Self {
            scanner,
            store,
            shared,
            event_tx,
            status_tx,
            reading_tx,
            retry_timer: Arc::new(TaskTimer::new("retry")),
            scan_timer: Arc::new(TaskTimer::new("scan-timeout")),
            is_running: Arc::new(AtomicBool::new(true)),
            loop_handle: RwLock::new(None),
            pump_handle: RwLock::new(None),
            callback_counter: AtomicU64::new(0),
        };

        manager.spawn_event_loop(event_rx);
        manager.spawn_central_pump();

        // btleplug does not replay the current adapter state, and a usable
        // adapter implies a powered radio
        let _ = manager.event_tx.send(LinkEvent::RadioState(RadioState::PoweredOn));

        Ok(manager)
    }

    /// Request discovery of the sensor.
    ///
    /// No-op with a "Bluetooth not available" status if the radio is not
    /// powered on. Discovery stops by itself after the scan window and
    /// schedules a reconnection cycle.
    pub fn start_scanning(&self) -> Result<()> {
        self.send(LinkEvent::StartRequested)
    }

    /// Cancel any in-progress discovery; idempotent.
    pub fn stop_scanning(&self) -> Result<()> {
        self.send(LinkEvent::StopRequested)
    }

    /// Connect to a specific peripheral.
    ///
    /// The handle is remembered for automatic reconnection.
    pub fn connect(&self, peripheral: Peripheral) -> Result<()> {
        *self.shared.peripheral.write() = Some(peripheral);
        self.send(LinkEvent::ConnectRequested)
    }

    /// Tear the link down and disable automatic reconnection.
    pub fn disconnect(&self) -> Result<()> {
        self.send(LinkEvent::DisconnectRequested)
    }

    /// Current lifecycle state.
    pub fn link_state(&self) -> LinkState {
        self.shared.machine.lock().state()
    }

    /// Check if the sensor link is established.
    pub fn is_connected(&self) -> bool {
        self.shared.machine.lock().is_connected()
    }

    /// Periodic reconnection attempts made so far.
    pub fn retry_attempts(&self) -> u32 {
        self.shared.machine.lock().retry_attempts()
    }

    /// Latest published status.
    pub fn status(&self) -> StatusUpdate {
        self.shared.status.read().clone()
    }

    /// Last value read from the position characteristic, if any.
    pub fn sensor_position(&self) -> Option<SensorPosition> {
        *self.shared.sensor_position.read()
    }

    /// The reading store this manager records into.
    pub fn store(&self) -> Arc<ReadingStore> {
        self.store.clone()
    }

    /// Subscribe to status updates.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusUpdate> {
        self.status_tx.subscribe()
    }

    /// Subscribe to decoded readings.
    pub fn subscribe_readings(&self) -> broadcast::Receiver<Reading> {
        self.reading_tx.subscribe()
    }

    /// Register a callback for status updates.
    pub fn on_status<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(StatusUpdate) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.status_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(update) = rx.recv().await {
                callback(update);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Register a callback for decoded readings.
    pub fn on_reading<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Reading) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.reading_tx.subscribe();

        let handle = tokio::spawn(async move {
            while let Ok(reading) = rx.recv().await {
                callback(reading);
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Clean shutdown of timers, tasks, and any live connection.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down sensor manager");

        self.is_running.store(false, Ordering::SeqCst);
        self.retry_timer.cancel();
        self.scan_timer.cancel();

        if let Some(handle) = self.shared.notify_handle.write().take() {
            handle.abort();
        }

        let peripheral = self.shared.peripheral.read().clone();
        if let Some(peripheral) = peripheral {
            if peripheral.is_connected().await.unwrap_or(false) {
                if let Err(e) = peripheral.disconnect().await {
                    warn!("Error disconnecting sensor: {}", e);
                }
            }
        }

        self.scanner.shutdown().await;

        if let Some(handle) = self.loop_handle.write().take() {
            handle.abort();
        }
        if let Some(handle) = self.pump_handle.write().take() {
            handle.abort();
        }

        Ok(())
    }

    fn send(&self, event: LinkEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|_| Error::Internal("supervisor event loop stopped".to_string()))
    }

    /// Start the event loop that drives the state machine.
    fn spawn_event_loop(&self, mut event_rx: mpsc::UnboundedReceiver<LinkEvent>) {
        let runtime = Runtime {
            scanner: self.scanner.clone(),
            store: self.store.clone(),
            shared: self.shared.clone(),
            event_tx: self.event_tx.clone(),
            status_tx: self.status_tx.clone(),
            reading_tx: self.reading_tx.clone(),
            retry_timer: self.retry_timer.clone(),
            scan_timer: self.scan_timer.clone(),
        };
        let is_running = self.is_running.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }
                runtime.process(event).await;
            }

            debug!("Supervisor event loop ended");
        });

        *self.loop_handle.write() = Some(handle);
    }

    /// Start the task that maps central events into supervisor events.
    fn spawn_central_pump(&self) {
        let mut rx = self.scanner.subscribe();
        let shared = self.shared.clone();
        let event_tx = self.event_tx.clone();
        let is_running = self.is_running.clone();

        let handle = tokio::spawn(async move {
            while is_running.load(Ordering::SeqCst) {
                tokio::select! {
                    result = rx.recv() => match result {
                        Ok(event) => Self::pump_event(event, &shared, &event_tx),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Central event pump lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        // Check if we should stop pumping
                        if !is_running.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                }
            }

            debug!("Central pump ended");
        });

        *self.pump_handle.write() = Some(handle);
    }

    fn pump_event(
        event: ScannerEvent,
        shared: &Arc<Shared>,
        event_tx: &mpsc::UnboundedSender<LinkEvent>,
    ) {
        match event {
            ScannerEvent::Discovered(discovery) => {
                if !discovery.is_sensor() {
                    return;
                }

                // Remember the handle; Connect acts on the latest match
                *shared.peripheral.write() = Some(discovery.peripheral.clone());

                let _ = event_tx.send(LinkEvent::DeviceDiscovered {
                    matches_name: discovery.matches_name,
                    advertises_service: discovery.advertises_service,
                });
            }
            ScannerEvent::Connected(identifier) => {
                if Self::is_known_peripheral(shared, &identifier) {
                    let _ = event_tx.send(LinkEvent::Connected);
                }
            }
            ScannerEvent::Disconnected(identifier) => {
                if Self::is_known_peripheral(shared, &identifier) {
                    let _ = event_tx.send(LinkEvent::Disconnected);
                }
            }
            ScannerEvent::RadioState(radio) => {
                let _ = event_tx.send(LinkEvent::RadioState(radio));
            }
        }
    }

    fn is_known_peripheral(shared: &Arc<Shared>, identifier: &str) -> bool {
        shared
            .peripheral
            .read()
            .as_ref()
            .map(|peripheral| peripheral.id().to_string() == identifier)
            .unwrap_or(false)
    }
}

impl Drop for SensorManager {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

impl Runtime {
    /// Process one event: run it through the machine, then execute the
    /// commands. The machine lock is never held across an await.
    async fn process(&self, event: LinkEvent) {
        if matches!(event, LinkEvent::Disconnected) {
            self.drop_session();
        }

        let commands = { self.shared.machine.lock().handle(event) };

        for command in commands {
            self.execute(command).await;
        }
    }

    /// Clear per-session caches once the link drops.
    fn drop_session(&self) {
        *self.shared.measurement_char.write() = None;
        *self.shared.position_char.write() = None;
        if let Some(handle) = self.shared.notify_handle.write().take() {
            handle.abort();
        }
    }

    async fn execute(&self, command: Command) {
        trace!(?command, "Executing command");

        match command {
            Command::StartScan => {
                if let Err(e) = self.scanner.start_scanning().await {
                    warn!("Failed to start scan: {}", e);
                }
            }
            Command::StopScan => {
                if let Err(e) = self.scanner.stop_scanning().await {
                    warn!("Failed to stop scan: {}", e);
                }
            }
            Command::StartScanTimeout => {
                self.scan_timer
                    .start_once(SCAN_TIMEOUT, self.event_tx.clone(), LinkEvent::ScanTimedOut);
            }
            Command::CancelScanTimeout => self.scan_timer.cancel(),
            Command::StartRetryTimer => {
                self.retry_timer.start_repeating(
                    RETRY_INTERVAL,
                    self.event_tx.clone(),
                    LinkEvent::RetryTick,
                );
            }
            Command::CancelRetryTimer => self.retry_timer.cancel(),
            Command::Connect => self.connect_known_device(),
            Command::Teardown => self.teardown().await,
            Command::DiscoverServices => self.discover_services(),
            Command::DiscoverCharacteristics => self.discover_characteristics(),
            Command::SubscribeMeasurement => self.subscribe_measurement(),
            Command::ReadPosition => self.read_position(),
            Command::DeliverMeasurement(payload) => self.deliver(payload),
            Command::Announce(status) => self.announce(status),
        }
    }

    /// Begin a connection attempt to the last known device handle.
    ///
    /// Runs in its own task; the outcome comes back through the queue.
    /// An attempt in flight is never cancelled; the radio stack is
    /// trusted to resolve it eventually.
    fn connect_known_device(&self) {
        let peripheral = self.shared.peripheral.read().clone();
        let Some(peripheral) = peripheral else {
            warn!("Connect requested without a known device handle");
            let _ = self.event_tx.send(LinkEvent::ConnectFailed);
            return;
        };

        info!("Connecting to sensor");
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            match peripheral.connect().await {
                Ok(()) => {
                    info!("Connected to sensor");
                    let _ = event_tx.send(LinkEvent::Connected);
                }
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                    let _ = event_tx.send(LinkEvent::ConnectFailed);
                }
            }
        });
    }

    async fn teardown(&self) {
        let peripheral = self.shared.peripheral.read().clone();
        if let Some(peripheral) = peripheral {
            if let Err(e) = peripheral.disconnect().await {
                warn!("Failed to disconnect: {}", e);
            }
        }
        self.drop_session();
    }

    fn discover_services(&self) {
        let Some(peripheral) = self.shared.peripheral.read().clone() else {
            return;
        };
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            match peripheral.discover_services().await {
                Ok(()) => {
                    let has_target = peripheral
                        .services()
                        .iter()
                        .any(|service| service.uuid == SENSOR_SERVICE_UUID);
                    debug!(has_target, "Service discovery complete");
                    let _ = event_tx.send(LinkEvent::ServicesDiscovered { has_target });
                }
                Err(e) => {
                    warn!("Service discovery failed: {}", e);
                    let _ = event_tx.send(LinkEvent::ServicesDiscovered { has_target: false });
                }
            }
        });
    }

    /// Resolve the two known characteristics from the sensor service.
    fn discover_characteristics(&self) {
        let Some(peripheral) = self.shared.peripheral.read().clone() else {
            return;
        };

        let mut has_measurement = false;
        let mut has_position = false;

        for service in peripheral.services() {
            if service.uuid != SENSOR_SERVICE_UUID {
                continue;
            }
            for characteristic in service.characteristics {
                if characteristic.uuid == MEASUREMENT_CHARACTERISTIC_UUID {
                    *self.shared.measurement_char.write() = Some(characteristic);
                    has_measurement = true;
                } else if characteristic.uuid == POSITION_CHARACTERISTIC_UUID {
                    *self.shared.position_char.write() = Some(characteristic);
                    has_position = true;
                }
            }
        }

        debug!(has_measurement, has_position, "Characteristics resolved");
        let _ = self.event_tx.send(LinkEvent::CharacteristicsDiscovered {
            has_measurement,
            has_position,
        });
    }

    fn subscribe_measurement(&self) {
        let Some(peripheral) = self.shared.peripheral.read().clone() else {
            return;
        };
        let Some(characteristic) = self.shared.measurement_char.read().clone() else {
            warn!("Measurement characteristic missing, cannot subscribe");
            let _ = self
                .event_tx
                .send(LinkEvent::NotifyStateUpdated { enabled: false });
            return;
        };

        self.start_notification_listener(peripheral.clone());

        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            match peripheral.subscribe(&characteristic).await {
                Ok(()) => {
                    debug!("Subscribed to measurement notifications");
                    let _ = event_tx.send(LinkEvent::NotifyStateUpdated { enabled: true });
                }
                Err(e) => {
                    warn!("Failed to subscribe to measurements: {}", e);
                    let _ = event_tx.send(LinkEvent::NotifyStateUpdated { enabled: false });
                }
            }
        });
    }

    /// One listener task per session forwards measurement payloads into
    /// the queue; superseded on resubscribe, aborted on disconnect.
    fn start_notification_listener(&self, peripheral: Peripheral) {
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            let mut notifications = match peripheral.notifications().await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to get notification stream: {}", e);
                    return;
                }
            };

            while let Some(notification) = notifications.next().await {
                if notification.uuid == MEASUREMENT_CHARACTERISTIC_UUID {
                    trace!(
                        len = notification.value.len(),
                        "Measurement notification received"
                    );
                    let _ = event_tx.send(LinkEvent::MeasurementNotified(notification.value));
                }
            }

            debug!("Notification stream ended");
        });

        let mut slot = self.shared.notify_handle.write();
        if let Some(prev) = slot.take() {
            prev.abort();
        }
        *slot = Some(handle);
    }

    fn read_position(&self) {
        let Some(peripheral) = self.shared.peripheral.read().clone() else {
            return;
        };
        let Some(characteristic) = self.shared.position_char.read().clone() else {
            return;
        };
        let shared = self.shared.clone();

        tokio::spawn(async move {
            match peripheral.read(&characteristic).await {
                Ok(data) => {
                    if let Some(position) = SensorPosition::decode(&data) {
                        debug!(position = position.name(), "Sensor position read");
                        *shared.sensor_position.write() = Some(position);
                    }
                }
                Err(e) => warn!("Failed to read sensor position: {}", e),
            }
        });
    }

    /// Decode a measurement payload and record the reading.
    ///
    /// Short payloads are dropped without surfacing an error.
    fn deliver(&self, payload: Vec<u8>) {
        let Some(measurement) = Measurement::decode(&payload) else {
            debug!(len = payload.len(), "Dropping short measurement payload");
            return;
        };

        let reading = self
            .store
            .record(measurement.celsius(), PLACEHOLDER_HUMIDITY);

        debug!(
            fahrenheit = measurement.fahrenheit,
            celsius = reading.temperature,
            "Recorded reading"
        );

        let _ = self.reading_tx.send(reading);
    }

    fn announce(&self, status: LinkStatus) {
        let connected = self.shared.machine.lock().is_connected();
        let update = StatusUpdate {
            connected,
            message: status.to_string(),
        };

        debug!(connected, message = %update.message, "Status");

        *self.shared.status.write() = update.clone();
        let _ = self.status_tx.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_update_clone() {
        let update = StatusUpdate {
            connected: true,
            message: LinkStatus::Connected.to_string(),
        };
        let cloned = update.clone();
        assert_eq!(update, cloned);
    }

    #[test]
    fn test_callback_handle_unregisters_once() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let handle = CallbackHandle::new(0, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(handle.id(), 0);
        handle.unregister();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_handle_unregisters_on_drop() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        {
            let _handle = CallbackHandle::new(1, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
