//! The inbound NOTIFY listener seam
//!
//! A registry starts its listener when the first subscription needs a
//! callback URL and stops it when the last subscription goes away.

use std::net::IpAddr;

use async_trait::async_trait;
use callback_server::{CallbackServer, NotificationPayload};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dispatcher::NotifyDispatcher;
use crate::error::{Result, SubscriptionError};

/// Receives NOTIFY requests and hands them to a dispatcher.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Start listening and return the callback URL devices should post to.
    async fn start(&self, dispatcher: NotifyDispatcher) -> Result<String>;

    /// Stop listening. Stopping a stopped listener does nothing.
    async fn stop(&self);

    fn is_running(&self) -> bool;
}

struct Running {
    server: CallbackServer,
    pump: JoinHandle<()>,
}

/// [`EventListener`] backed by the warp [`CallbackServer`]
pub struct CallbackListener {
    port_range: (u16, u16),
    advertise_ip: Option<IpAddr>,
    running: Mutex<Option<Running>>,
}

impl CallbackListener {
    pub fn new(port_range: (u16, u16), advertise_ip: Option<IpAddr>) -> Self {
        Self {
            port_range,
            advertise_ip,
            running: Mutex::new(None),
        }
    }

    /// Port of the running server
    pub fn port(&self) -> Option<u16> {
        self.running.lock().as_ref().map(|r| r.server.port())
    }
}

#[async_trait]
impl EventListener for CallbackListener {
    async fn start(&self, dispatcher: NotifyDispatcher) -> Result<String> {
        if let Some(running) = self.running.lock().as_ref() {
            return Ok(running.server.base_url().to_string());
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<NotificationPayload>();
        let server = CallbackServer::with_advertised_ip(self.port_range, self.advertise_ip, tx)
            .await
            .map_err(|e| SubscriptionError::Listener(e.to_string()))?;
        let url = server.base_url().to_string();

        let pump = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let outcome = dispatcher.handle_notification(&notification.headers, &notification.body);
                debug!(?outcome, path = %notification.path, "notification dispatched");
            }
        });

        let mut running = self.running.lock();
        if let Some(existing) = running.as_ref() {
            // Lost a start race; keep the server that is already published.
            let url = existing.server.base_url().to_string();
            pump.abort();
            drop(server);
            return Ok(url);
        }
        *running = Some(Running { server, pump });
        info!(url = %url, "NOTIFY listener started");
        Ok(url)
    }

    async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(Running { server, pump }) = running {
            server.shutdown().await;
            pump.abort();
            info!("NOTIFY listener stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl std::fmt::Debug for CallbackListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackListener")
            .field("port_range", &self.port_range)
            .field("advertise_ip", &self.advertise_ip)
            .field("running", &self.is_running())
            .finish()
    }
}
