//! Configuration for the topology engine

/// Configuration for a [`ZoneTopologyEngine`](crate::ZoneTopologyEngine)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// When polling hits a device that does not support `GetZoneGroupState`,
    /// wait for ZoneGroupTopology events instead of failing.
    /// Default: true
    pub event_fallback: bool,

    /// Let polls be answered from the action response cache
    /// Default: true
    pub poll_cache: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            event_fallback: true,
            poll_cache: true,
        }
    }
}

impl TopologyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_fallback(mut self, enabled: bool) -> Self {
        self.event_fallback = enabled;
        self
    }

    pub fn with_poll_cache(mut self, enabled: bool) -> Self {
        self.poll_cache = enabled;
        self
    }
}
