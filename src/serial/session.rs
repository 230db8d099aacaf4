use super::codec::{self, Command, Reply};
use super::interface::{Connector, SerialConnector, Transport};
use super::{LinkSettings, Result, SerialError};

/// Owns the beacon link and runs one command/reply exchange at a time
pub struct BeaconSession {
    connector: Box<dyn Connector>,
    link: LinkSettings,
    transport: Option<Box<dyn Transport>>,
}

impl BeaconSession {
    pub fn new(connector: Box<dyn Connector>, link: LinkSettings) -> Self {
        Self {
            connector,
            link,
            transport: None,
        }
    }

    /// Session over real serial ports with the default line settings
    pub fn serial() -> Self {
        Self::new(Box::new(SerialConnector), LinkSettings::default())
    }

    /// Open the link at `address`, replacing any link already open
    pub fn connect(&mut self, address: &str) -> Result<()> {
        self.close();
        log::info!("Configured port = {}", address);

        let transport = self.connector.open(address, &self.link)?;
        self.transport = Some(transport);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn address(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.address())
    }

    pub fn link(&self) -> &LinkSettings {
        &self.link
    }

    /// Encode, write, then block for one reply line
    pub async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        let transport = self.transport.as_mut().ok_or(SerialError::NotConnected)?;

        let wire = command.encode();
        log::debug!("-> {}", wire);
        transport.write_line(&wire).await?;

        let line = transport.read_line().await?;
        log::debug!("<- {}", line.trim_end());
        Ok(codec::decode(&line))
    }

    /// Like [`send_command`](Self::send_command) but every failure becomes the `ER` reply
    pub async fn send_command_or_sentinel(&mut self, command: &Command) -> Reply {
        match self.send_command(command).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("{} failed: {}", command.mnemonic, e);
                Reply::sentinel()
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            log::info!("Closing beacon link on {}", transport.address());
        }
    }
}

impl Default for BeaconSession {
    fn default() -> Self {
        Self::serial()
    }
}
