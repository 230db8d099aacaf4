use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export serial protocol models
pub use crate::serial::protocol::{BeaconConfig, BeaconStatus, ConfigForm, HardwareKind, StatusCode};

/// Text shown while the beacon cannot be reached
pub const NO_CONNECTION: &str = "No connection";

/// Link state as seen by the poller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Everything the status display shows, recomputed every poll tick
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    pub connection: ConnectionState,
    /// Set once hardware, band and interval were read after connecting
    pub seeded: bool,
    pub pc_time: Option<DateTime<Utc>>,
    pub beacon_time: Option<DateTime<Utc>>,
    /// Local clock minus beacon clock, in seconds
    pub clock_skew_secs: Option<i64>,
    pub last_time_sync: Option<DateTime<Utc>>,
    pub status: Option<StatusCode>,
    pub status_text: String,
    pub hardware: Option<HardwareKind>,
    /// Band selection (meters) seeded from the beacon
    pub band: Option<u32>,
    /// Interval selection (minutes) seeded from the beacon
    pub interval: Option<u32>,
    pub progress: Option<u32>,
    /// Display flagged red
    pub alert: bool,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionState::Connected)
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.seeded = false;
        self.beacon_time = None;
        self.clock_skew_secs = None;
        self.status = Some(StatusCode::Error);
        self.status_text = NO_CONNECTION.to_string();
        self.progress = None;
        self.alert = true;
    }

    pub(crate) fn mark_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.seeded = false;
    }
}
