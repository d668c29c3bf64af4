//! Supervisor events and status reporting.
//!
//! Every input to the supervisor (caller intents, radio callbacks, and
//! timer firings) is one [`LinkEvent`] delivered through a single queue,
//! so handlers never interleave.

/// Radio power state as reported by the platform BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RadioState {
    /// State not yet reported.
    #[default]
    Unknown,
    /// Radio is powered on and usable.
    PoweredOn,
    /// Radio is powered off.
    PoweredOff,
    /// The app is not authorized to use the radio.
    Unauthorized,
    /// The platform has no usable radio hardware.
    Unsupported,
    /// The radio stack is resetting.
    Resetting,
}

impl RadioState {
    /// Check if the radio is usable.
    pub fn is_powered_on(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

/// Input to the supervisor state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Caller asked to start discovery.
    StartRequested,
    /// Caller asked to stop discovery.
    StopRequested,
    /// Caller supplied a device handle and asked to connect.
    ConnectRequested,
    /// Caller asked to tear the link down and stop retrying.
    DisconnectRequested,
    /// The radio reported a power state change.
    RadioState(RadioState),
    /// A peripheral advertisement was seen during discovery.
    DeviceDiscovered {
        /// Advertised name contained a known sensor name fragment.
        matches_name: bool,
        /// Advertisement carried the sensor service UUID.
        advertises_service: bool,
    },
    /// A connection attempt completed.
    Connected,
    /// A connection attempt failed.
    ConnectFailed,
    /// The link dropped.
    Disconnected,
    /// Service discovery completed.
    ServicesDiscovered {
        /// The sensor service was present.
        has_target: bool,
    },
    /// Characteristic resolution completed.
    CharacteristicsDiscovered {
        /// The measurement characteristic was present.
        has_measurement: bool,
        /// The position characteristic was present.
        has_position: bool,
    },
    /// The measurement subscription was confirmed or refused.
    NotifyStateUpdated {
        /// Whether notifications are now enabled.
        enabled: bool,
    },
    /// A measurement notification arrived.
    MeasurementNotified(Vec<u8>),
    /// Discovery ran for the full scan window without a match.
    ScanTimedOut,
    /// The periodic reconnection timer fired.
    RetryTick,
}

/// User-facing connection status.
///
/// `Display` renders the exact strings shown in the UI status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The radio is not usable.
    RadioUnavailable,
    /// The radio reported powered-off.
    RadioOff,
    /// The app lacks permission to use the radio.
    RadioUnauthorized,
    /// The platform has no usable radio.
    RadioUnsupported,
    /// The radio stack is resetting.
    RadioResetting,
    /// The radio state is unknown.
    RadioUnknown,
    /// The radio is powered on and idle.
    ReadyToConnect,
    /// Discovery is running.
    Scanning,
    /// A connection attempt is in flight.
    Connecting,
    /// The sensor link is established.
    Connected,
    /// The link is down and no retry is scheduled.
    Disconnected,
    /// The link dropped; automatic reconnection started.
    Reconnecting,
    /// Discovery timed out without finding the sensor.
    SensorNotFound,
    /// A connection attempt failed; a retry is scheduled.
    ConnectFailedRetrying,
    /// A numbered periodic reconnection attempt is running.
    RetryAttempt(u32),
    /// Automatic reconnection gave up.
    GaveUp,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RadioUnavailable => write!(f, "Bluetooth not available"),
            Self::RadioOff => write!(f, "Bluetooth is off"),
            Self::RadioUnauthorized => write!(f, "Bluetooth permission denied"),
            Self::RadioUnsupported => write!(f, "Bluetooth not supported"),
            Self::RadioResetting => write!(f, "Bluetooth resetting"),
            Self::RadioUnknown => write!(f, "Bluetooth state unknown"),
            Self::ReadyToConnect => write!(f, "Ready to connect"),
            Self::Scanning => write!(f, "Scanning for ESP32..."),
            Self::Connecting => write!(f, "Connecting to ESP32..."),
            Self::Connected => write!(f, "Connected to Temperature Monitor"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Reconnecting => write!(f, "Disconnected - Reconnecting..."),
            Self::SensorNotFound => write!(f, "ESP32 not found. Will retry..."),
            Self::ConnectFailedRetrying => write!(f, "Connection failed. Retrying..."),
            Self::RetryAttempt(n) => write!(f, "Reconnecting... (attempt {})", n),
            Self::GaveUp => write!(f, "Unable to reconnect. Please restart app."),
        }
    }
}
