//! On-disk settings for the control panel.
//!
//! A single JSON file in the user's home directory holding the serial
//! device the beacon was last selected on. Single process, single writer.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE_NAME: &str = "fxk_wspr.json";
pub const SERIAL_DEVICE_KEY: &str = "serial_device";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_device: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store at `<home>/fxk_wspr.json`
    pub fn open_default() -> Result<Self> {
        let dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::open(dirs.home_dir().join(SETTINGS_FILE_NAME)))
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings; a missing file reads as defaults
    pub fn load(&self) -> Result<Settings> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Settings::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, json)?;
        log::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Stored serial device, or an empty string when none is set
    pub fn get(&self) -> Result<String> {
        Ok(self.load()?.serial_device.unwrap_or_default())
    }

    pub fn set(&self, address: &str) -> Result<()> {
        let mut settings = self.load()?;
        settings.serial_device = Some(address.to_string());
        self.save(&settings)
    }

    /// Remove an entry; unknown keys are ignored
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut settings = self.load()?;
        match key {
            SERIAL_DEVICE_KEY if settings.serial_device.is_some() => {
                settings.serial_device = None;
                self.save(&settings)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join(SETTINGS_FILE_NAME));
        assert_eq!(store.get().unwrap(), "");
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join(SETTINGS_FILE_NAME));

        store.set("/dev/ttyUSB0").unwrap();
        assert_eq!(store.get().unwrap(), "/dev/ttyUSB0");

        // Survives reopening
        let reopened = SettingsStore::open(store.path());
        assert_eq!(reopened.get().unwrap(), "/dev/ttyUSB0");

        reopened.delete("no_such_key").unwrap();
        assert_eq!(reopened.get().unwrap(), "/dev/ttyUSB0");

        reopened.delete(SERIAL_DEVICE_KEY).unwrap();
        assert_eq!(reopened.get().unwrap(), "");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "not json").unwrap();
        let store = SettingsStore::open(path);
        assert!(matches!(store.get(), Err(ConfigError::Serialization(_))));
    }
}
