pub mod store;

pub use store::{ConfigError, Settings, SettingsStore, SERIAL_DEVICE_KEY, SETTINGS_FILE_NAME};
