//! Zone topology engine
//!
//! Topology reaches the engine two ways: polled `GetZoneGroupState`
//! responses and ZoneGroupTopology events. Both carry the same document and
//! usually repeat what the engine already knows, so every payload is reduced
//! to a canonical form first and only a payload that differs from the last
//! accepted one is parsed. An accepted payload replaces the whole model.

mod normalize;
mod parse;

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sonos_api::{DeviceAddress, Service, SonosClient};
use sonos_stream::Event;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TopologyConfig;
use crate::error::{Result, StateError};
use crate::model::{Group, PayloadSource, TopologyPayload, Zone};

const GET_ZONE_GROUP_STATE: &str = "GetZoneGroupState";

/// Zones and groups of one accepted payload.
///
/// Snapshots are immutable; the engine swaps in a new one per accepted
/// payload.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub all_zones: Vec<Arc<Zone>>,
    pub visible_zones: Vec<Arc<Zone>>,
    pub groups: Vec<Group>,
    /// When the payload was accepted; `None` for the empty initial snapshot
    pub updated_at: Option<DateTime<Utc>>,
}

impl TopologySnapshot {
    fn new(zones: Vec<Arc<Zone>>, groups: Vec<Group>) -> Self {
        let visible_zones = zones.iter().filter(|zone| zone.is_visible()).cloned().collect();
        Self {
            all_zones: zones,
            visible_zones,
            groups,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn zone_by_uuid(&self, uuid: &str) -> Option<Arc<Zone>> {
        self.all_zones.iter().find(|zone| zone.uuid == uuid).cloned()
    }

    /// First visible zone with `name`
    pub fn zone_by_name(&self, name: &str) -> Option<Arc<Zone>> {
        self.visible_zones.iter().find(|zone| zone.name == name).cloned()
    }

    pub fn group_for_zone(&self, uuid: &str) -> Option<Group> {
        self.groups.iter().find(|group| group.contains(uuid)).cloned()
    }
}

/// Counters kept by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TopologyStats {
    /// Payloads offered, including repeats and ones that failed to parse
    pub total_requests: u64,
    /// Payloads that replaced the model
    pub processed_count: u64,
    pub zone_count: usize,
    pub group_count: usize,
}

/// Result of offering a payload to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOutcome {
    /// The payload differed from the last one and replaced the model
    Applied,
    /// Same topology as the last accepted payload
    Unchanged,
}

/// Result of [`ZoneTopologyEngine::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    Unchanged,
    /// The device does not support polling; topology will come from events
    Deferred,
}

impl From<PayloadOutcome> for PollOutcome {
    fn from(outcome: PayloadOutcome) -> Self {
        match outcome {
            PayloadOutcome::Applied => PollOutcome::Applied,
            PayloadOutcome::Unchanged => PollOutcome::Unchanged,
        }
    }
}

#[derive(Default)]
struct EngineState {
    snapshot: Arc<TopologySnapshot>,
    last_normalized: Option<String>,
    last_payload: Option<Arc<TopologyPayload>>,
    total_requests: u64,
    processed_count: u64,
}

/// Tracks zones and groups across polls and events.
///
/// ```rust,no_run
/// use sonos_api::{DeviceAddress, SonosClient};
/// use sonos_state::{TopologyConfig, ZoneTopologyEngine};
///
/// # async fn demo() -> sonos_state::Result<()> {
/// let engine = ZoneTopologyEngine::new(SonosClient::new()?, TopologyConfig::default());
/// engine.poll(&DeviceAddress::new("192.168.1.100".parse().unwrap())).await?;
///
/// for zone in engine.visible_zones() {
///     println!("{} ({})", zone.name, zone.uuid);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZoneTopologyEngine {
    client: SonosClient,
    config: TopologyConfig,
    state: Mutex<EngineState>,
}

impl ZoneTopologyEngine {
    pub fn new(client: SonosClient, config: TopologyConfig) -> Self {
        Self {
            client,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Fetch the topology from one reachable zone and apply it.
    ///
    /// A device that rejects the action as unsupported yields
    /// [`PollOutcome::Deferred`] when event fallback is enabled and
    /// [`StateError::NotSupported`] otherwise. Nothing is retried.
    pub async fn poll(&self, device: &DeviceAddress) -> Result<PollOutcome> {
        let invoker = self.client.invoker(device.clone(), Service::ZoneGroupTopology);
        let response = match invoker
            .send_command(GET_ZONE_GROUP_STATE, &[], self.config.poll_cache)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_unsupported() => {
                let code = e.fault().map(|f| f.error_code.clone()).unwrap_or_default();
                if self.config.event_fallback {
                    info!(%device, code = %code, "topology polling unsupported, waiting for events");
                    return Ok(PollOutcome::Deferred);
                }
                return Err(StateError::NotSupported {
                    action: GET_ZONE_GROUP_STATE,
                    device: device.to_string(),
                    code,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let xml = response.get("ZoneGroupState").ok_or_else(|| {
            StateError::Parse("GetZoneGroupState response has no ZoneGroupState".to_string())
        })?;
        self.process_payload(xml, PayloadSource::Poll, Some(device.ip))
            .map(PollOutcome::from)
    }

    /// Offer a `ZoneGroupState` document to the engine.
    ///
    /// This is the single ingestion point for polls, events and callers. A
    /// payload that fails to parse leaves the model and the repeat marker as
    /// they were.
    pub fn process_payload(
        &self,
        xml: &str,
        source: PayloadSource,
        source_ip: Option<IpAddr>,
    ) -> Result<PayloadOutcome> {
        let mut state = self.state.lock();
        state.total_requests += 1;

        let zone_groups = normalize::zone_groups(xml)?;
        let normalized = normalize::normalize(&zone_groups);

        if state.last_normalized.as_deref() == Some(normalized.as_str()) {
            debug!(?source, ip = ?source_ip, "topology unchanged");
            return Ok(PayloadOutcome::Unchanged);
        }

        let parsed = parse::build(&zone_groups)?;
        let snapshot = TopologySnapshot::new(parsed.zones, parsed.groups);

        info!(
            ?source,
            ip = ?source_ip,
            zones = snapshot.all_zones.len(),
            visible = snapshot.visible_zones.len(),
            groups = snapshot.groups.len(),
            "topology updated"
        );

        state.processed_count += 1;
        state.snapshot = Arc::new(snapshot);
        state.last_payload = Some(Arc::new(TopologyPayload {
            raw: xml.to_string(),
            normalized: normalized.clone(),
            source,
            source_ip,
            received_at: Utc::now(),
        }));
        state.last_normalized = Some(normalized);
        Ok(PayloadOutcome::Applied)
    }

    /// Apply the `zone_group_state` carried by a ZoneGroupTopology event.
    ///
    /// Events without it (for example ones that only report
    /// `available_software_update`) return `Ok(None)`.
    pub fn process_event(&self, event: &Event, source_ip: Option<IpAddr>) -> Result<Option<PayloadOutcome>> {
        match event.text("zone_group_state") {
            Some(xml) => self.process_payload(xml, PayloadSource::Event, source_ip).map(Some),
            None => Ok(None),
        }
    }

    /// Feed every event from `events` into the engine until the stream ends.
    pub fn spawn_event_feed(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<Event>,
        source_ip: Option<IpAddr>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Err(e) = engine.process_event(&event, source_ip) {
                    warn!(sid = %event.sid, seq = event.seq, error = %e, "topology event rejected");
                }
            }
            debug!("topology event feed ended");
        })
    }

    /// Forget the last accepted payload so the next one is applied even if
    /// it repeats. The model is kept.
    pub fn clear_cache(&self) {
        self.state.lock().last_normalized = None;
    }

    /// Discard all zone and group data
    pub fn clear_zone_groups(&self) {
        let mut state = self.state.lock();
        state.snapshot = Arc::new(TopologySnapshot::default());
        state.last_normalized = None;
        state.last_payload = None;
    }

    /// The current model. Later updates never modify a returned snapshot.
    pub fn snapshot(&self) -> Arc<TopologySnapshot> {
        Arc::clone(&self.state.lock().snapshot)
    }

    pub fn all_zones(&self) -> Vec<Arc<Zone>> {
        self.snapshot().all_zones.clone()
    }

    /// Zones shown to users: no invisible zones, no satellites
    pub fn visible_zones(&self) -> Vec<Arc<Zone>> {
        self.snapshot().visible_zones.clone()
    }

    pub fn groups(&self) -> Vec<Group> {
        self.snapshot().groups.clone()
    }

    pub fn zone_by_uuid(&self, uuid: &str) -> Option<Arc<Zone>> {
        self.snapshot().zone_by_uuid(uuid)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<Arc<Zone>> {
        self.snapshot().zone_by_name(name)
    }

    pub fn group_for_zone(&self, uuid: &str) -> Option<Group> {
        self.snapshot().group_for_zone(uuid)
    }

    pub fn stats(&self) -> TopologyStats {
        let state = self.state.lock();
        TopologyStats {
            total_requests: state.total_requests,
            processed_count: state.processed_count,
            zone_count: state.snapshot.all_zones.len(),
            group_count: state.snapshot.groups.len(),
        }
    }

    pub fn last_payload(&self) -> Option<Arc<TopologyPayload>> {
        self.state.lock().last_payload.clone()
    }
}

impl std::fmt::Debug for ZoneTopologyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneTopologyEngine")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
