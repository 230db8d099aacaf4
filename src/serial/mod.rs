pub mod codec;
pub mod interface;
pub mod protocol;
pub mod session;

pub use codec::{Command, Param, Reply};
pub use interface::{Connector, SerialConnector, SerialInterface, Transport};
pub use session::BeaconSession;

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// The beacon firmware runs its UART at 9600 baud.
pub const BAUD_RATE: u32 = 9600;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(3);

/// Serial line parameters used when opening the beacon link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Asserting DTR on open resets the Arduino, so it stays low by default.
    pub dtr_on_open: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            read_timeout: READ_TIMEOUT,
            write_timeout: WRITE_TIMEOUT,
            dtr_on_open: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialDeviceInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Coarse classification of a link failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Address invalid or the port could not be opened
    ConnectFailure,
    /// Write or read error, read timeout, or no open link
    TransportFailure,
    /// Reply shape does not match what the command expects
    ProtocolFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Communication timeout")]
    Timeout,

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

impl SerialError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SerialError::ConnectionFailed(_) => FailureKind::ConnectFailure,
            SerialError::ProtocolError(_) | SerialError::InvalidParameter(_) => FailureKind::ProtocolFailure,
            SerialError::NotConnected
            | SerialError::Timeout
            | SerialError::IoError(_)
            | SerialError::SerialportError(_) => FailureKind::TransportFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;
