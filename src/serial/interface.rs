use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tokio::time::timeout;

use super::{LinkSettings, Result, SerialDeviceInfo, SerialError};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Line oriented byte stream to the beacon
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Address the transport was opened on
    fn address(&self) -> &str;

    /// Write one already terminated command string
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Read one `\n` terminated line, waiting at most the read timeout.
    /// Bytes without a terminator at the deadline are dropped as a timeout.
    async fn read_line(&mut self) -> Result<String>;
}

/// Opens transports by address
pub trait Connector: Send + Sync {
    fn open(&self, address: &str, link: &LinkSettings) -> Result<Box<dyn Transport>>;
}

pub struct SerialInterface {
    port: Box<dyn SerialPort>,
    address: String,
    link: LinkSettings,
    pending: Vec<u8>,
}

impl SerialInterface {
    /// Open the serial device at `address`
    pub fn open(address: &str, link: &LinkSettings) -> Result<Self> {
        if address.is_empty() {
            return Err(SerialError::ConnectionFailed("No serial device configured".to_string()));
        }

        let port = serialport::new(address, link.baud_rate)
            .timeout(link.read_timeout)
            .dtr_on_open(link.dtr_on_open)
            .open()
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", address, e)))?;

        log::info!("Opened beacon link on {} at {} baud", address, link.baud_rate);
        Self::from_port(port, address, link)
    }

    /// Wrap a port that is already open
    pub fn from_port(mut port: Box<dyn SerialPort>, address: &str, link: &LinkSettings) -> Result<Self> {
        port.set_timeout(link.read_timeout)?;
        Ok(Self {
            port,
            address: address.to_string(),
            link: link.clone(),
            pending: Vec::new(),
        })
    }

    /// List every serial port the OS reports
    pub fn discover_ports() -> Result<Vec<SerialDeviceInfo>> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let (port_type, manufacturer, product) = match p.port_type {
                    SerialPortType::UsbPort(info) => (
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid),
                        info.manufacturer,
                        info.product,
                    ),
                    SerialPortType::PciPort => ("PCI".to_string(), None, None),
                    SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None),
                    SerialPortType::Unknown => ("Native".to_string(), None, None),
                };
                SerialDeviceInfo {
                    port_name: p.port_name,
                    port_type,
                    manufacturer,
                    product,
                }
            })
            .collect())
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

#[async_trait::async_trait]
impl Transport for SerialInterface {
    fn address(&self) -> &str {
        &self.address
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        // Drop leftovers of an earlier reply that arrived after its timeout
        self.pending.clear();
        self.port.clear(ClearBuffer::Input)?;

        self.port.set_timeout(self.link.write_timeout)?;
        let written = self
            .port
            .write_all(line.as_bytes())
            .and_then(|_| self.port.flush());
        self.port.set_timeout(self.link.read_timeout)?;

        written.map_err(|e| match e.kind() {
            ErrorKind::TimedOut => SerialError::Timeout,
            _ => SerialError::IoError(e),
        })
    }

    async fn read_line(&mut self) -> Result<String> {
        if let Some(line) = self.take_line() {
            return Ok(line);
        }

        let read_timeout = self.link.read_timeout;
        let port = &mut self.port;
        let pending = &mut self.pending;

        let read_operation = async {
            loop {
                if pending.contains(&b'\n') {
                    return Ok(());
                }
                let waiting = port.bytes_to_read();
                match waiting {
                    Ok(0) => tokio::time::sleep(POLL_INTERVAL).await,
                    Ok(available) => {
                        let mut chunk = vec![0u8; available as usize];
                        match port.read(&mut chunk) {
                            Ok(n) => pending.extend_from_slice(&chunk[..n]),
                            Err(ref e) if e.kind() == ErrorKind::TimedOut => {}
                            Err(e) => return Err(SerialError::IoError(e)),
                        }
                    }
                    Err(e) => return Err(SerialError::SerialportError(e)),
                }
            }
        };

        match timeout(read_timeout, read_operation).await {
            Ok(Ok(())) => self.take_line().ok_or(SerialError::Timeout),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                if !self.pending.is_empty() {
                    log::debug!("Discarding unterminated reply {:?}", String::from_utf8_lossy(&self.pending));
                    self.pending.clear();
                }
                Err(SerialError::Timeout)
            }
        }
    }
}

/// Connector backed by real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn open(&self, address: &str, link: &LinkSettings) -> Result<Box<dyn Transport>> {
        Ok(Box::new(SerialInterface::open(address, link)?))
    }
}
