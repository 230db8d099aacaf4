pub mod models;
pub mod poller;

pub use models::*;
pub use poller::{poll_once, Poller};


#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No serial device configured")]
    NoDeviceConfigured,

    #[error("Invalid beacon configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] crate::serial::SerialError),

    #[error("Settings error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
