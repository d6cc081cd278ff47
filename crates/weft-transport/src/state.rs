use std::fmt;

/// Connection state of the bridge.
///
/// `Disconnected` only before the first attempt. After that the bridge cycles
/// `Connecting -> Open -> Closed | Errored -> Connecting` until shut down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// The service closed the connection.
    Closed,
    /// Connecting or using the connection failed.
    Errored,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Whether a reconnect is due from this state.
    pub fn is_down(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Open)
                | (Connecting, Errored)
                | (Open, Closed)
                | (Open, Errored)
                | (Closed, Connecting)
                | (Errored, Connecting)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
