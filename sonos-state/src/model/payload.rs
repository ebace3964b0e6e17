//! Topology payload bookkeeping

use std::net::IpAddr;

use chrono::{DateTime, Utc};

/// Where a topology payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// `GetZoneGroupState` response
    Poll,
    /// ZoneGroupTopology event
    Event,
    /// Handed in by the caller
    Manual,
}

/// The last payload the engine accepted
#[derive(Debug, Clone)]
pub struct TopologyPayload {
    pub raw: String,
    /// Canonical form used to recognise repeats
    pub normalized: String,
    pub source: PayloadSource,
    pub source_ip: Option<IpAddr>,
    pub received_at: DateTime<Utc>,
}
