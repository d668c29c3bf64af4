//! The connection supervisor state machine.
//!
//! Pure and deterministic: every caller intent, radio callback, and timer
//! firing is a [`LinkEvent`] fed through [`LinkMachine::handle`], which
//! mutates the single [`LinkState`] and returns the side effects for the
//! runtime to execute. No I/O or clocks live here, so the full
//! reconnection policy can be exercised in plain unit tests.

use std::time::Duration;

use tracing::debug;

use super::event::{LinkEvent, LinkStatus, RadioState};
use super::state::LinkState;

/// Interval between periodic reconnection attempts.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Automatic reconnection gives up after this many timer ticks.
pub const MAX_RETRY_ATTEMPTS: u32 = 100;

/// Discovery stops after this long without a match.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Side effect requested by the machine, executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin an unfiltered advertisement scan.
    StartScan,
    /// Stop any running scan; idempotent.
    StopScan,
    /// Arm the one-shot scan timeout, superseding any prior instance.
    StartScanTimeout,
    /// Disarm the scan timeout.
    CancelScanTimeout,
    /// Connect to the last known device handle.
    Connect,
    /// Tear down the live connection, if any.
    Teardown,
    /// Resolve the sensor service on the connected peripheral.
    DiscoverServices,
    /// Resolve the measurement and position characteristics.
    DiscoverCharacteristics,
    /// Enable notifications on the measurement characteristic.
    SubscribeMeasurement,
    /// Issue the one-time read of the position characteristic.
    ReadPosition,
    /// Arm the periodic retry timer, superseding any prior instance.
    StartRetryTimer,
    /// Disarm the retry timer.
    CancelRetryTimer,
    /// Decode a measurement payload and record the reading.
    DeliverMeasurement(Vec<u8>),
    /// Publish a status update.
    Announce(LinkStatus),
}

/// The connection supervisor.
///
/// Owns the link state, the reconnect flag, and the bounded retry counter.
/// At most one connection attempt is ever in flight: `Connect` commands are
/// suppressed while one is pending.
#[derive(Debug)]
pub struct LinkMachine {
    /// Current lifecycle state.
    state: LinkState,
    /// Last reported radio power state.
    radio: RadioState,
    /// Whether the supervisor should reconnect automatically.
    should_reconnect: bool,
    /// Whether a device handle is remembered for direct reconnection.
    has_known_device: bool,
    /// Whether a connection attempt is currently in flight.
    connect_in_flight: bool,
    /// Periodic reconnection attempts made so far, in `[0, MAX_RETRY_ATTEMPTS]`.
    retry_attempts: u32,
}

impl LinkMachine {
    /// Create a new machine in [`LinkState::Idle`].
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            radio: RadioState::Unknown,
            should_reconnect: false,
            has_known_device: false,
            connect_in_flight: false,
            retry_attempts: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Check if the sensor link is established.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Periodic reconnection attempts made so far.
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Whether automatic reconnection is enabled.
    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect
    }

    /// Process one event and return the side effects to execute.
    ///
    /// The sole mutator of the link state.
    pub fn handle(&mut self, event: LinkEvent) -> Vec<Command> {
        match event {
            LinkEvent::StartRequested => self.on_start_requested(),
            LinkEvent::StopRequested => self.on_stop_requested(),
            LinkEvent::ConnectRequested => self.on_connect_requested(),
            LinkEvent::DisconnectRequested => self.on_disconnect_requested(),
            LinkEvent::RadioState(radio) => self.on_radio_state(radio),
            LinkEvent::DeviceDiscovered {
                matches_name,
                advertises_service,
            } => self.on_device_discovered(matches_name, advertises_service),
            LinkEvent::Connected => self.on_connected(),
            LinkEvent::ConnectFailed => self.on_connect_failed(),
            LinkEvent::Disconnected => self.on_disconnected(),
            LinkEvent::ServicesDiscovered { has_target } => {
                self.on_services_discovered(has_target)
            }
            LinkEvent::CharacteristicsDiscovered {
                has_measurement,
                has_position,
            } => self.on_characteristics_discovered(has_measurement, has_position),
            LinkEvent::NotifyStateUpdated { enabled } => self.on_notify_state(enabled),
            LinkEvent::MeasurementNotified(payload) => {
                vec![Command::DeliverMeasurement(payload)]
            }
            LinkEvent::ScanTimedOut => self.on_scan_timed_out(),
            LinkEvent::RetryTick => self.on_retry_tick(),
        }
    }

    fn on_start_requested(&mut self) -> Vec<Command> {
        if !self.radio.is_powered_on() {
            return vec![Command::Announce(LinkStatus::RadioUnavailable)];
        }

        if self.state.is_scanning() {
            debug!("Already scanning, ignoring start request");
            return vec![];
        }

        self.retry_attempts = 0;
        self.begin_scan()
    }

    fn on_stop_requested(&mut self) -> Vec<Command> {
        if self.state.is_scanning() {
            self.transition(LinkState::Idle);
        }
        vec![Command::StopScan, Command::CancelScanTimeout]
    }

    fn on_connect_requested(&mut self) -> Vec<Command> {
        if self.connect_in_flight {
            debug!("Connection attempt already in flight, ignoring connect request");
            return vec![];
        }

        self.should_reconnect = true;
        self.has_known_device = true;
        self.retry_attempts = 0;
        self.connect_in_flight = true;
        self.transition(LinkState::Connecting);

        vec![
            Command::Connect,
            Command::Announce(LinkStatus::Connecting),
        ]
    }

    fn on_disconnect_requested(&mut self) -> Vec<Command> {
        self.should_reconnect = false;

        let mut commands = vec![Command::CancelRetryTimer, Command::CancelScanTimeout];
        if self.state.is_scanning() {
            commands.push(Command::StopScan);
        }
        commands.push(Command::Teardown);

        self.transition(LinkState::Idle);
        commands
    }

    fn on_radio_state(&mut self, radio: RadioState) -> Vec<Command> {
        self.radio = radio;

        match radio {
            RadioState::PoweredOn => {
                let mut commands = vec![Command::Announce(LinkStatus::ReadyToConnect)];
                if self.should_reconnect && !self.state.is_connected() {
                    commands.extend(self.begin_scan());
                }
                commands
            }
            RadioState::PoweredOff => {
                // No retries while the radio is down; a later powered-on
                // event resumes scanning if the reconnect flag is set.
                // Any attempt in flight dies with the radio.
                self.connect_in_flight = false;
                if self.state.is_connected() || self.state == LinkState::Reconnecting {
                    self.transition(LinkState::Disconnected);
                } else if self.state.is_scanning() {
                    self.transition(LinkState::Idle);
                }
                vec![
                    Command::CancelRetryTimer,
                    Command::CancelScanTimeout,
                    Command::Announce(LinkStatus::RadioOff),
                ]
            }
            RadioState::Unauthorized => {
                vec![Command::Announce(LinkStatus::RadioUnauthorized)]
            }
            RadioState::Unsupported => {
                vec![Command::Announce(LinkStatus::RadioUnsupported)]
            }
            RadioState::Resetting => vec![Command::Announce(LinkStatus::RadioResetting)],
            RadioState::Unknown => vec![Command::Announce(LinkStatus::RadioUnknown)],
        }
    }

    fn on_device_discovered(
        &mut self,
        matches_name: bool,
        advertises_service: bool,
    ) -> Vec<Command> {
        if !matches_name && !advertises_service {
            return vec![];
        }

        // First match wins, but only while discovery is relevant
        if !matches!(self.state, LinkState::Scanning | LinkState::Reconnecting) {
            return vec![];
        }

        if self.connect_in_flight {
            debug!("Connection attempt already in flight, ignoring discovery");
            return vec![];
        }

        self.should_reconnect = true;
        self.has_known_device = true;
        self.retry_attempts = 0;
        self.connect_in_flight = true;
        self.transition(LinkState::Connecting);

        vec![
            Command::StopScan,
            Command::CancelScanTimeout,
            Command::Connect,
            Command::Announce(LinkStatus::Connecting),
        ]
    }

    fn on_connected(&mut self) -> Vec<Command> {
        self.connect_in_flight = false;

        if self.state.is_connected() {
            // The central can report a connection we already acted on
            debug!("Duplicate connected event ignored");
            return vec![];
        }

        self.retry_attempts = 0;
        self.transition(LinkState::DiscoveringServices);

        vec![
            Command::CancelRetryTimer,
            Command::StopScan,
            Command::CancelScanTimeout,
            Command::DiscoverServices,
            Command::Announce(LinkStatus::Connected),
        ]
    }

    fn on_connect_failed(&mut self) -> Vec<Command> {
        self.connect_in_flight = false;

        let mut commands = vec![Command::Announce(LinkStatus::ConnectFailedRetrying)];

        if self.should_reconnect {
            self.transition(LinkState::Reconnecting);
            commands.push(Command::StartRetryTimer);
        } else if self.state == LinkState::Connecting {
            self.transition(LinkState::Disconnected);
        }

        commands
    }

    fn on_disconnected(&mut self) -> Vec<Command> {
        self.connect_in_flight = false;

        if self.should_reconnect {
            self.transition(LinkState::Reconnecting);

            // The sensor powers down between readings, so both paths run:
            // an immediate direct attempt and the patient periodic timer.
            let mut commands = Vec::new();
            if self.has_known_device {
                self.connect_in_flight = true;
                commands.push(Command::Connect);
            }
            commands.push(Command::StartRetryTimer);
            commands.push(Command::Announce(LinkStatus::Reconnecting));
            commands
        } else {
            self.transition(LinkState::Disconnected);
            vec![Command::Announce(LinkStatus::Disconnected)]
        }
    }

    fn on_services_discovered(&mut self, has_target: bool) -> Vec<Command> {
        if self.state != LinkState::DiscoveringServices {
            return vec![];
        }

        if !has_target {
            debug!("Connected peripheral does not expose the sensor service");
            return vec![];
        }

        vec![Command::DiscoverCharacteristics]
    }

    fn on_characteristics_discovered(
        &mut self,
        has_measurement: bool,
        has_position: bool,
    ) -> Vec<Command> {
        let mut commands = Vec::new();

        if has_measurement {
            self.transition(LinkState::SubscribingNotifications);
            commands.push(Command::SubscribeMeasurement);
        }
        if has_position {
            commands.push(Command::ReadPosition);
        }

        commands
    }

    fn on_notify_state(&mut self, enabled: bool) -> Vec<Command> {
        if enabled && self.state == LinkState::SubscribingNotifications {
            self.transition(LinkState::Ready);
        }
        vec![]
    }

    fn on_scan_timed_out(&mut self) -> Vec<Command> {
        match self.state {
            LinkState::Scanning => {
                self.transition(LinkState::Reconnecting);
                vec![
                    Command::StopScan,
                    Command::Announce(LinkStatus::SensorNotFound),
                    Command::StartRetryTimer,
                ]
            }
            // Periodic rescan from a retry tick came up empty; the retry
            // timer is already driving the cycle.
            LinkState::Reconnecting => vec![Command::StopScan],
            _ => vec![],
        }
    }

    fn on_retry_tick(&mut self) -> Vec<Command> {
        if self.state != LinkState::Reconnecting {
            return vec![];
        }

        if self.retry_attempts >= MAX_RETRY_ATTEMPTS {
            debug!("Retry ceiling reached, giving up");
            self.transition(LinkState::Failed);
            return vec![
                Command::CancelRetryTimer,
                Command::Announce(LinkStatus::GaveUp),
            ];
        }

        self.retry_attempts += 1;

        let mut commands = vec![Command::Announce(LinkStatus::RetryAttempt(
            self.retry_attempts,
        ))];

        if self.has_known_device && !self.connect_in_flight {
            self.connect_in_flight = true;
            commands.push(Command::Connect);
        }

        // Restart discovery alongside the direct attempt
        commands.push(Command::StartScan);
        commands.push(Command::StartScanTimeout);

        commands
    }

    fn begin_scan(&mut self) -> Vec<Command> {
        self.transition(LinkState::Scanning);
        vec![
            Command::StartScan,
            Command::StartScanTimeout,
            Command::Announce(LinkStatus::Scanning),
        ]
    }

    fn transition(&mut self, next: LinkState) {
        if self.state != next {
            debug!("Link state changed: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}

impl Default for LinkMachine {
    fn default() -> Self {
        Self::new()
    }
}
