//! Supervisor link states.

/// Lifecycle state of the sensor link.
///
/// Exactly one instance exists per supervisor and it is mutated only by
/// [`LinkMachine::handle`](super::machine::LinkMachine::handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkState {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Discovery is running.
    Scanning,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected; resolving the sensor service.
    DiscoveringServices,
    /// Service resolved; enabling measurement notifications.
    SubscribingNotifications,
    /// Fully connected and receiving measurements.
    Ready,
    /// Link lost with no retry scheduled.
    Disconnected,
    /// Link lost; automatic reconnection in progress.
    Reconnecting,
    /// Reconnection gave up after reaching the attempt ceiling.
    Failed,
}

impl LinkState {
    /// Check if the link to the sensor is established.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::DiscoveringServices | Self::SubscribingNotifications | Self::Ready
        )
    }

    /// Check if measurements are flowing.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if discovery is running.
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning)
    }

    /// Check if the supervisor has given up.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Connecting => write!(f, "Connecting"),
            Self::DiscoveringServices => write!(f, "DiscoveringServices"),
            Self::SubscribingNotifications => write!(f, "SubscribingNotifications"),
            Self::Ready => write!(f, "Ready"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}
