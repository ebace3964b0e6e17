//! # sonos-stream
//!
//! GENA event subscriptions for Sonos speakers.
//!
//! A [`SubscriptionRegistry`] hands out [`Subscription`]s, runs the NOTIFY
//! listener they share and routes each notification to the subscription whose
//! SID it carries. Notification bodies are parsed into [`Event`]s with
//! lower_snake_case variable names; `LastChange` documents are unpacked into
//! the variables they carry.
//!
//! ```rust,no_run
//! use sonos_api::{DeviceAddress, Service, SonosClient};
//! use sonos_stream::{StreamConfig, SubscriptionRegistry};
//!
//! # async fn demo() -> sonos_stream::Result<()> {
//! let registry = SubscriptionRegistry::new(SonosClient::new()?, StreamConfig::default())?;
//! let device = DeviceAddress::new("192.168.1.100".parse().unwrap());
//!
//! let rendering = registry.subscription(device, Service::RenderingControl);
//! let mut events = rendering.events();
//! rendering.subscribe(None, true).await?;
//!
//! if let Some(event) = events.recv().await {
//!     println!("master volume: {:?}", event.channel("volume", "Master"));
//! }
//! rendering.dispose().await;
//! # Ok(())
//! # }
//! ```

mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod listener;
pub mod parser;
pub mod registry;
pub mod subscription;

#[cfg(test)]
mod test_support;

pub use config::StreamConfig;
pub use dispatcher::{DispatchOutcome, NotifyDispatcher};
pub use error::{ParseError, Result, SubscriptionError};
pub use event::{Event, EventValue, EventVariables};
pub use listener::{CallbackListener, EventListener};
pub use parser::{parse_propertyset, EventParser};
pub use registry::SubscriptionRegistry;
pub use subscription::{Subscription, SubscriptionStatus};
