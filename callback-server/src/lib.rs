//! Generic UPnP callback server for receiving event notifications.
//!
//! This crate provides a lightweight HTTP server for UPnP `NOTIFY` requests.
//! It knows nothing about Sonos devices or services: it validates the GENA
//! headers, then forwards each notification as a [`NotificationPayload`]
//! (path, headers and raw body) over an unbounded channel.
//!
//! # Example
//!
//! ```no_run
//! use callback_server::{CallbackServer, NotificationPayload};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::CallbackError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
//!     let server = CallbackServer::new((3400, 3500), tx).await?;
//!     println!("Callback server listening at: {}", server.base_url());
//!
//!     tokio::spawn(async move {
//!         while let Some(notification) = rx.recv().await {
//!             println!(
//!                 "SID {:?} SEQ {:?}: {} bytes",
//!                 notification.subscription_id(),
//!                 notification.header("seq"),
//!                 notification.body.len()
//!             );
//!         }
//!     });
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Private Workspace Crate
//!
//! This crate is intended for internal use within the workspace.

mod error;
mod payload;
mod server;

pub use error::{CallbackError, Result};
pub use payload::NotificationPayload;
pub use server::{detect_local_ip, CallbackServer};
