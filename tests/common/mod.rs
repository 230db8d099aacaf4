#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use wspr_beacon_lib::serial::{Connector, LinkSettings, Result, SerialError, Transport};
use wspr_beacon_lib::BeaconSession;

/// What the fake beacon does when a line is read
pub enum Script {
    Line(&'static str),
    Timeout,
    IoError,
}

#[derive(Default)]
pub struct Wire {
    pub written: Vec<String>,
    pub replies: VecDeque<Script>,
    pub opened: Vec<String>,
}

/// In-memory beacon shared between the test and the session
#[derive(Clone, Default)]
pub struct FakeBeacon {
    pub wire: Arc<Mutex<Wire>>,
    accepted: Arc<Vec<String>>,
}

impl FakeBeacon {
    /// Only `addresses` can be opened
    pub fn accepting(addresses: &[&str]) -> Self {
        Self {
            wire: Arc::default(),
            accepted: Arc::new(addresses.iter().map(|a| a.to_string()).collect()),
        }
    }

    pub fn reply(&self, line: &'static str) -> &Self {
        self.wire.lock().unwrap().replies.push_back(Script::Line(line));
        self
    }

    pub fn push(&self, script: Script) -> &Self {
        self.wire.lock().unwrap().replies.push_back(script);
        self
    }

    pub fn written(&self) -> Vec<String> {
        self.wire.lock().unwrap().written.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.wire.lock().unwrap().opened.clone()
    }

    pub fn session(&self) -> BeaconSession {
        BeaconSession::new(Box::new(self.clone()), LinkSettings::default())
    }

    /// Session already connected to the first accepted address
    pub fn connected_session(&self) -> BeaconSession {
        let mut session = self.session();
        session.connect(&self.accepted[0]).unwrap();
        self.wire.lock().unwrap().opened.clear();
        session
    }
}

struct FakeTransport {
    address: String,
    wire: Arc<Mutex<Wire>>,
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.wire.lock().unwrap().written.push(line.to_string());
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String> {
        match self.wire.lock().unwrap().replies.pop_front() {
            Some(Script::Line(line)) => Ok(line.to_string()),
            Some(Script::IoError) => Err(SerialError::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            Some(Script::Timeout) | None => Err(SerialError::Timeout),
        }
    }
}

impl Connector for FakeBeacon {
    fn open(&self, address: &str, _link: &LinkSettings) -> Result<Box<dyn Transport>> {
        self.wire.lock().unwrap().opened.push(address.to_string());
        if !self.accepted.iter().any(|a| a == address) {
            return Err(SerialError::ConnectionFailed(format!("{}: No such file or directory", address)));
        }
        Ok(Box::new(FakeTransport {
            address: address.to_string(),
            wire: self.wire.clone(),
        }))
    }
}
