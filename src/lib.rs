pub mod serial;
pub mod device;
pub mod commands;
pub mod config;

pub use config::SettingsStore;
pub use device::{Poller, SessionState};
pub use serial::BeaconSession;
