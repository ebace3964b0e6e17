use std::fmt;
use std::net::IpAddr;

use crate::Service;

/// Port every Sonos device serves UPnP on
pub const SONOS_PORT: u16 = 1400;

/// Where a device can be reached, as handed over by discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    pub ip: IpAddr,
    pub port: u16,
    /// `RINCON_…` identifier, when discovery already knows it
    pub uuid: Option<String>,
}

impl DeviceAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            port: SONOS_PORT,
            uuid: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// `http://{ip}:{port}`
    pub fn base_url(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("http://{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("http://[{}]:{}", ip, self.port),
        }
    }

    pub fn control_url(&self, service: Service) -> String {
        format!("{}{}", self.base_url(), service.info().control_path)
    }

    pub fn event_url(&self, service: Service) -> String {
        format!("{}{}", self.base_url(), service.info().event_path)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uuid {
            Some(uuid) => write!(f, "{} ({}:{})", uuid, self.ip, self.port),
            None => write!(f, "{}:{}", self.ip, self.port),
        }
    }
}
