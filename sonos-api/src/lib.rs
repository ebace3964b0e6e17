//! Sonos UPnP service catalogue and action invocation
//!
//! This crate sits on top of the private `soap-client` crate and adds the
//! Sonos-specific pieces: the [`Service`] catalogue, device addressing, a
//! cached [`ActionInvoker`] and the GENA requests used by event subscriptions.
//!
//! ```rust,no_run
//! use sonos_api::{DeviceAddress, Service, SonosClient};
//!
//! # async fn demo() -> sonos_api::Result<()> {
//! let client = SonosClient::new()?;
//! let device = DeviceAddress::new("192.168.1.100".parse().unwrap());
//!
//! let transport = client.invoker(device, Service::AVTransport);
//! let info = transport
//!     .send_command("GetTransportInfo", &[("InstanceID", "0")], false)
//!     .await?;
//! println!("state: {}", info["CurrentTransportState"]);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod service;

pub use client::{ActionInvoker, SonosClient};
pub use config::InvokerConfig;
pub use device::{DeviceAddress, SONOS_PORT};
pub use error::{ApiError, Result};
pub use service::{Service, ServiceInfo};

pub use soap_client::{ActionResponse, HttpRequest, HttpResponse, HttpTransport, SoapError, SubscriptionResponse, UpnpFault};
