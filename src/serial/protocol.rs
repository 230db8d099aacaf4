use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec::{Command, Reply};
use super::session::BeaconSession;
use super::{Result, SerialError};

/// Bands (meters) the beacon can transmit on
pub const BANDS: [u32; 9] = [160, 80, 40, 30, 20, 17, 15, 12, 10];
/// Transmission intervals (minutes)
pub const INTERVALS: [u32; 4] = [2, 4, 6, 8];

/// Transmit power levels as (watts, dBm). Both lookup directions use this table.
pub const POWER_LEVELS: [(&str, u8); 18] = [
    ("0.001", 0),
    ("0.002", 3),
    ("0.005", 7),
    ("0.01", 10),
    ("0.02", 13),
    ("0.05", 17),
    ("0.1", 20),
    ("0.2", 23),
    ("0.5", 27),
    ("1", 30),
    ("2", 33),
    ("5", 37),
    ("10", 40),
    ("20", 43),
    ("50", 47),
    ("100", 50),
    ("200", 53),
    ("500", 57),
];

pub fn watts_to_dbm(watts: &str) -> Option<u8> {
    POWER_LEVELS
        .iter()
        .find(|(w, _)| *w == watts)
        .map(|(_, dbm)| *dbm)
}

pub fn dbm_to_watts(dbm: u8) -> Option<&'static str> {
    POWER_LEVELS
        .iter()
        .find(|(_, d)| *d == dbm)
        .map(|(w, _)| *w)
}

/// Beacon state code reported by `WS ST`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Disabled,
    WaitingForSlot,
    OnAir,
    Error,
    Tuning,
    Unknown(String),
}

impl StatusCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "DI" => StatusCode::Disabled,
            "WT" => StatusCode::WaitingForSlot,
            "OA" => StatusCode::OnAir,
            "ER" => StatusCode::Error,
            "TU" => StatusCode::Tuning,
            other => StatusCode::Unknown(other.to_string()),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            StatusCode::Disabled => "Disabled".to_string(),
            StatusCode::WaitingForSlot => "Waiting for timeslot".to_string(),
            StatusCode::OnAir => "---= On Air =---".to_string(),
            StatusCode::Error => "No connection".to_string(),
            StatusCode::Tuning => "Tuning".to_string(),
            StatusCode::Unknown(code) => format!("Unknown ({})", code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconStatus {
    pub code: StatusCode,
    /// Minutes, as the beacon reports it
    pub interval: u32,
    /// Meters, as the beacon reports it
    pub band: u32,
}

impl BeaconStatus {
    /// Status replies carry exactly three fields: state, interval, band
    pub fn from_reply(reply: &Reply) -> Result<Self> {
        match reply.fields() {
            [code, interval, band] => Ok(Self {
                code: StatusCode::from_code(code),
                interval: parse_field(interval, "interval")?,
                band: parse_field(band, "band")?,
            }),
            other => Err(SerialError::ProtocolError(format!(
                "status reply has {} fields, expected 3",
                other.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareKind {
    Ad9850,
    Si5351,
    Unknown(String),
}

impl HardwareKind {
    pub fn from_id(id: &str) -> Self {
        match id {
            "1" => HardwareKind::Ad9850,
            "2" => HardwareKind::Si5351,
            other => HardwareKind::Unknown(other.to_string()),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HardwareKind::Ad9850 => "SA6VEE board with AD9850",
            HardwareKind::Si5351 => "Arduino UNO with Si5351 and DS3231 real time clock",
            HardwareKind::Unknown(_) => "Unknown",
        }
    }
}

/// Station configuration stored in the beacon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconConfig {
    pub callsign: String,
    pub locator: String,
    pub power_dbm: u8,
    pub calibration_offset: String,
}

impl BeaconConfig {
    /// Config replies carry exactly four fields: call, locator, dBm, offset
    pub fn from_reply(reply: &Reply) -> Result<Self> {
        match reply.fields() {
            [callsign, locator, power, offset] => Ok(Self {
                callsign: callsign.clone(),
                locator: locator.clone(),
                power_dbm: parse_field(power, "power")?,
                calibration_offset: offset.clone(),
            }),
            other => Err(SerialError::ProtocolError(format!(
                "config reply has {} fields, expected 4",
                other.len()
            ))),
        }
    }

    /// `QC<CALL>,<LOC4>,<dBm>,<offset>;`
    pub fn to_command(&self) -> Command {
        let locator: String = self.locator.chars().take(4).collect();
        Command::new("QC")
            .param(self.callsign.to_uppercase())
            .param(locator)
            .param(self.power_dbm)
            .param(self.calibration_offset.clone())
    }
}

/// Text fields of the configuration form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigForm {
    pub callsign: String,
    pub locator: String,
    pub power_watts: String,
    pub calibration_offset: String,
}

impl Default for ConfigForm {
    fn default() -> Self {
        Self {
            callsign: String::new(),
            locator: String::new(),
            power_watts: "0".to_string(),
            calibration_offset: String::new(),
        }
    }
}

impl ConfigForm {
    /// Fill the form from a `QC` reply; anything but four fields leaves it blank
    pub fn from_reply(reply: &Reply) -> Self {
        match reply.fields() {
            [callsign, locator, power, offset] => {
                let power_watts = power
                    .parse::<u8>()
                    .ok()
                    .and_then(dbm_to_watts)
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        log::warn!("Beacon reported unknown power level {} dBm", power);
                        "0".to_string()
                    });
                Self {
                    callsign: callsign.clone(),
                    locator: locator.clone(),
                    power_watts,
                    calibration_offset: offset.clone(),
                }
            }
            _ => Self::default(),
        }
    }

    pub fn to_config(&self) -> Result<BeaconConfig> {
        let power_dbm = watts_to_dbm(&self.power_watts).ok_or_else(|| {
            SerialError::InvalidParameter(format!("Unsupported power level {} W", self.power_watts))
        })?;
        Ok(BeaconConfig {
            callsign: self.callsign.clone(),
            locator: self.locator.clone(),
            power_dbm,
            calibration_offset: self.calibration_offset.clone(),
        })
    }
}

/// Unix seconds rounded to the nearest second
pub fn unix_seconds(now: DateTime<Utc>) -> i64 {
    (now.timestamp_millis() + 500).div_euclid(1000)
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| SerialError::ProtocolError(format!("Invalid {}: {:?}", name, field)))
}

fn single_field(reply: Reply, what: &str) -> Result<String> {
    if reply.is_sentinel() || reply.is_blank() || reply.len() != 1 {
        return Err(SerialError::ProtocolError(format!(
            "Unexpected {} reply: {:?}",
            what,
            reply.fields()
        )));
    }
    Ok(reply.into_fields().remove(0))
}

/// Typed beacon commands
impl BeaconSession {
    /// `QT;` returns the beacon clock as unix seconds
    pub async fn query_time(&mut self) -> Result<i64> {
        let reply = self.send_command(&Command::new("QT")).await?;
        let field = single_field(reply, "time")?;
        parse_field(&field, "time")
    }

    /// `QT<seconds>;` sets the beacon clock
    pub async fn set_time(&mut self, now: DateTime<Utc>) -> Result<Reply> {
        let seconds = unix_seconds(now);
        log::info!("Synchronising beacon time to {}", seconds);
        let reply = self.send_command(&Command::new("QT").param(seconds)).await?;
        if reply.is_sentinel() {
            return Err(SerialError::ProtocolError("Beacon rejected time update".to_string()));
        }
        Ok(reply)
    }

    /// `WSST;`
    pub async fn query_status(&mut self) -> Result<BeaconStatus> {
        let reply = self.send_command(&Command::new("WS").param("ST")).await?;
        BeaconStatus::from_reply(&reply)
    }

    /// `WSTX,<interval>,<band>;`
    pub async fn start_transmission(&mut self, interval: u32, band: u32) -> Result<Reply> {
        let command = Command::new("WS").param("TX").param(interval).param(band);
        self.send_command(&command).await
    }

    /// `WSCA;`
    pub async fn cancel_transmission(&mut self) -> Result<Reply> {
        self.send_command(&Command::new("WS").param("CA")).await
    }

    /// `TX2,<band>;` keys the transmitter for tuning
    pub async fn tune(&mut self, band: u32) -> Result<Reply> {
        self.send_command(&Command::new("TX").param(2u32).param(band)).await
    }

    /// `QH;`
    pub async fn query_hardware(&mut self) -> Result<HardwareKind> {
        let reply = self.send_command(&Command::new("QH")).await?;
        let id = single_field(reply, "hardware")?;
        Ok(HardwareKind::from_id(&id))
    }

    /// `QC;`
    pub async fn read_config(&mut self) -> Result<BeaconConfig> {
        let reply = self.send_command(&Command::new("QC")).await?;
        BeaconConfig::from_reply(&reply)
    }

    pub async fn write_config(&mut self, config: &BeaconConfig) -> Result<Reply> {
        self.send_command(&config.to_command()).await
    }
}
