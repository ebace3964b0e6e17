//! Sonos zone topology state
//!
//! [`ZoneTopologyEngine`] keeps the household's zones and groups current from
//! two sources that report the same `ZoneGroupState` document: polled
//! `GetZoneGroupState` responses and ZoneGroupTopology events. Repeats are
//! recognised and skipped, and each accepted payload replaces the model as a
//! whole.
//!
//! # Architecture
//!
//! ```text
//! poll ──► ActionInvoker ─┐
//!                         ├─► process_payload ─► normalize ─► parse ─► TopologySnapshot
//! NOTIFY ─► Subscription ─┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sonos_api::{DeviceAddress, Service, SonosClient};
//! use sonos_state::{TopologyConfig, ZoneTopologyEngine};
//! use sonos_stream::{StreamConfig, SubscriptionRegistry};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! sonos_state::logging::init_logging_from_env()?;
//!
//! let client = SonosClient::new()?;
//! let device = DeviceAddress::new("192.168.1.100".parse()?);
//!
//! let engine = Arc::new(ZoneTopologyEngine::new(client.clone(), TopologyConfig::default()));
//! engine.poll(&device).await?;
//!
//! let registry = SubscriptionRegistry::new(client, StreamConfig::default())?;
//! let topology = registry.subscription(device.clone(), Service::ZoneGroupTopology);
//! let feed = engine.spawn_event_feed(topology.events(), Some(device.ip));
//! topology.subscribe(None, true).await?;
//!
//! for group in engine.groups() {
//!     println!("{} -> {} members", group.coordinator.name, group.members.len());
//! }
//! # drop(feed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod topology;

pub use config::TopologyConfig;
pub use error::{Result, StateError};
pub use logging::{init_logging, LoggingError, LoggingMode};
pub use model::{Group, PayloadSource, TopologyPayload, Zone};
pub use topology::{PayloadOutcome, PollOutcome, TopologySnapshot, TopologyStats, ZoneTopologyEngine};
