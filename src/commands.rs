use chrono::{DateTime, Utc};

use crate::config::{SettingsStore, SERIAL_DEVICE_KEY};
use crate::device::{DeviceError, Result};
use crate::serial::codec::{Command, Reply, SEPARATOR, TERMINATOR};
use crate::serial::protocol::{BeaconStatus, ConfigForm, HardwareKind, BANDS, INTERVALS};
use crate::serial::{BeaconSession, SerialDeviceInfo, SerialError, SerialInterface};

/// List serial ports available for the beacon
pub fn list_ports() -> Result<Vec<SerialDeviceInfo>> {
    Ok(SerialInterface::discover_ports()?)
}

/// Stored serial device, empty when none was chosen
pub fn get_serial_device(store: &SettingsStore) -> Result<String> {
    Ok(store.get()?)
}

/// Persist the chosen serial device and reconnect to it.
/// Returns whether the beacon link opened.
pub fn set_serial_device(store: &SettingsStore, session: &mut BeaconSession, address: &str) -> Result<bool> {
    store.set(address)?;
    log::info!("Serial device set to {}", address);

    match session.connect(address) {
        Ok(()) => Ok(true),
        Err(e) => {
            log::warn!("Failed to connect to {}: {}", address, e);
            Ok(false)
        }
    }
}

pub fn clear_serial_device(store: &SettingsStore) -> Result<()> {
    Ok(store.delete(SERIAL_DEVICE_KEY)?)
}

/// Open the session on `address`, falling back to the stored device
pub fn connect_beacon(session: &mut BeaconSession, store: &SettingsStore, address: Option<&str>) -> Result<()> {
    let address = match address {
        Some(address) => address.to_string(),
        None => store.get()?,
    };
    if address.is_empty() {
        return Err(DeviceError::NoDeviceConfigured);
    }
    session.connect(&address)?;
    Ok(())
}

pub async fn beacon_status(session: &mut BeaconSession) -> Result<BeaconStatus> {
    Ok(session.query_status().await?)
}

pub async fn hardware(session: &mut BeaconSession) -> Result<HardwareKind> {
    Ok(session.query_hardware().await?)
}

/// Start transmitting every `interval` minutes on `band` meters
pub async fn start_transmission(session: &mut BeaconSession, interval: u32, band: u32) -> Result<Reply> {
    if band == 0 || interval == 0 {
        return Err(DeviceError::InvalidConfiguration("Please select band and interval".to_string()));
    }
    validate_band(band)?;
    if !INTERVALS.contains(&interval) {
        return Err(DeviceError::InvalidConfiguration(format!(
            "Interval must be one of {:?} minutes",
            INTERVALS
        )));
    }
    Ok(session.start_transmission(interval, band).await?)
}

pub async fn stop_transmission(session: &mut BeaconSession) -> Result<Reply> {
    Ok(session.cancel_transmission().await?)
}

pub async fn tune(session: &mut BeaconSession, band: u32) -> Result<Reply> {
    validate_band(band)?;
    Ok(session.tune(band).await?)
}

pub async fn sync_time(session: &mut BeaconSession, now: DateTime<Utc>) -> Result<Reply> {
    Ok(session.set_time(now).await?)
}

/// Read the station configuration into form fields.
/// A failed read yields a blank form.
pub async fn read_config_form(session: &mut BeaconSession) -> ConfigForm {
    let reply = session.send_command_or_sentinel(&Command::new("QC")).await;
    ConfigForm::from_reply(&reply)
}

pub async fn write_config_form(session: &mut BeaconSession, form: &ConfigForm) -> Result<Reply> {
    for (name, value) in [
        ("callsign", &form.callsign),
        ("locator", &form.locator),
        ("calibration offset", &form.calibration_offset),
    ] {
        if value.contains([SEPARATOR, TERMINATOR]) {
            return Err(DeviceError::InvalidConfiguration(format!(
                "{} must not contain '{}' or '{}'",
                name, SEPARATOR, TERMINATOR
            )));
        }
    }
    let config = form.to_config().map_err(|e| match e {
        SerialError::InvalidParameter(msg) => DeviceError::InvalidConfiguration(msg),
        other => DeviceError::from(other),
    })?;
    Ok(session.write_config(&config).await?)
}

fn validate_band(band: u32) -> Result<()> {
    if BANDS.contains(&band) {
        Ok(())
    } else {
        Err(DeviceError::InvalidConfiguration(format!(
            "Band must be one of {:?} meters",
            BANDS
        )))
    }
}
