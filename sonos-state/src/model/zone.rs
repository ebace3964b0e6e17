//! Zone type

use std::net::IpAddr;
use std::sync::{Arc, Weak};

/// One player as reported by ZoneGroupTopology.
///
/// Satellites (surrounds and subs bonded to a soundbar) are zones of their
/// own that point back at the zone they are bonded to.
#[derive(Debug, Clone)]
pub struct Zone {
    /// `RINCON_…` identifier
    pub uuid: String,
    /// Device description URL
    pub location: String,
    /// Host of `location`, when it is an IP literal
    pub ip: Option<IpAddr>,
    /// `scheme://host:port` of `location`
    pub base_url: Option<String>,
    /// Room name shown to users
    pub name: String,
    pub boot_seq: Option<u32>,
    pub invisible: bool,
    pub is_coordinator: bool,
    pub is_satellite: bool,
    pub has_satellites: bool,
    pub software_version: Option<String>,
    pub is_zone_bridge: bool,
    pub(crate) parent: Option<Weak<Zone>>,
}

impl Zone {
    /// The zone a satellite is bonded to, while that zone is still live
    pub fn parent(&self) -> Option<Arc<Zone>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Shown to users: neither invisible nor a satellite
    pub fn is_visible(&self) -> bool {
        !self.invisible && !self.is_satellite
    }
}

/// Split a device description URL into its IP and base URL.
///
/// `http://192.168.1.100:1400/xml/device_description.xml` gives
/// `192.168.1.100` and `http://192.168.1.100:1400`.
pub(crate) fn split_location(location: &str) -> (Option<IpAddr>, Option<String>) {
    let Some((scheme, rest)) = location.split_once("://") else {
        return (None, None);
    };
    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return (None, None);
    }

    let host = match authority.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or_default(),
        None => authority.split(':').next().unwrap_or_default(),
    };

    (host.parse().ok(), Some(format!("{}://{}", scheme, authority)))
}
