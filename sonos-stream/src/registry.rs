//! Shared state for every subscription of one control point

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use sonos_api::{DeviceAddress, Service, SonosClient};
use tracing::debug;

use crate::config::StreamConfig;
use crate::dispatcher::NotifyDispatcher;
use crate::error::Result;
use crate::listener::{CallbackListener, EventListener};
use crate::parser::EventParser;
use crate::subscription::{Subscription, SubscriptionInner};

/// Routes notifications to subscriptions by SID and owns the NOTIFY listener
/// they share.
///
/// The listener starts with the first subscription and stops once none are
/// left. The registry only holds weak references, so dropping every handle
/// of a subscription is enough to end it.
pub struct SubscriptionRegistry {
    self_ref: Weak<SubscriptionRegistry>,
    client: SonosClient,
    config: StreamConfig,
    listener: Arc<dyn EventListener>,
    subscriptions: DashMap<String, Weak<SubscriptionInner>>,
    parser: EventParser,
    listener_url: tokio::sync::Mutex<Option<String>>,
    // Subscribes that hold a callback URL but are not registered yet
    pending: AtomicUsize,
}

impl SubscriptionRegistry {
    /// Registry using the warp callback server as its listener
    pub fn new(client: SonosClient, config: StreamConfig) -> Result<Arc<Self>> {
        let listener = CallbackListener::new(config.callback_port_range, config.advertise_ip);
        Self::with_listener(client, Arc::new(listener), config)
    }

    pub fn with_listener(
        client: SonosClient,
        listener: Arc<dyn EventListener>,
        config: StreamConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            client,
            parser: EventParser::new(config.parse_memo_capacity),
            config,
            listener,
            subscriptions: DashMap::new(),
            listener_url: tokio::sync::Mutex::new(None),
            pending: AtomicUsize::new(0),
        }))
    }

    /// New idle subscription to `service` on `device`
    pub fn subscription(self: &Arc<Self>, device: DeviceAddress, service: Service) -> Subscription {
        Subscription::new(Arc::clone(self), device, service)
    }

    /// Active subscription holding `sid`
    pub fn lookup(&self, sid: &str) -> Option<Subscription> {
        let weak = self.subscriptions.get(sid).map(|entry| entry.value().clone())?;
        match weak.upgrade() {
            Some(inner) => Some(Subscription::from_inner(inner)),
            None => {
                self.subscriptions.remove_if(sid, |_, w| w.strong_count() == 0);
                None
            }
        }
    }

    /// Number of active subscriptions
    pub fn count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    pub fn sids(&self) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Cancel every active subscription
    pub async fn cancel_all(&self) {
        let active: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .map(Subscription::from_inner)
            .collect();

        for subscription in active {
            subscription.cancel_subscription().await;
        }
        self.release_listener_if_idle().await;
    }

    /// Dispatcher that routes notifications into this registry
    pub fn dispatcher(&self) -> NotifyDispatcher {
        NotifyDispatcher::new(self.self_ref.clone())
    }

    pub fn parser(&self) -> &EventParser {
        &self.parser
    }

    pub fn client(&self) -> &SonosClient {
        &self.client
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_running()
    }

    pub(crate) fn register(&self, sid: &str, subscription: Weak<SubscriptionInner>) {
        self.subscriptions.insert(sid.to_string(), subscription);
    }

    pub(crate) fn unregister(&self, sid: &str) {
        self.subscriptions.remove(sid);
    }

    /// Callback URL of the running listener, starting it if needed.
    ///
    /// The listener is kept alive while the returned lease exists, so the
    /// caller holds it until the subscription is registered or has failed.
    pub(crate) async fn ensure_listener(&self) -> Result<ListenerLease<'_>> {
        let mut url = self.listener_url.lock().await;
        let callback_url = match url.as_ref() {
            Some(url) => url.clone(),
            None => {
                let started = self.listener.start(self.dispatcher()).await?;
                *url = Some(started.clone());
                started
            }
        };
        self.pending.fetch_add(1, Ordering::SeqCst);
        Ok(ListenerLease {
            registry: self,
            callback_url,
        })
    }

    fn has_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Stop the listener when nothing uses it any more
    pub(crate) async fn release_listener_if_idle(&self) {
        let mut url = self.listener_url.lock().await;
        if url.is_none() || self.has_pending() || self.count() > 0 {
            return;
        }
        self.listener.stop().await;
        *url = None;
        debug!("no subscriptions left, listener released");
    }
}

/// Claim on the shared listener held by a subscribe in progress
pub(crate) struct ListenerLease<'a> {
    registry: &'a SubscriptionRegistry,
    callback_url: String,
}

impl ListenerLease<'_> {
    pub(crate) fn callback_url(&self) -> &str {
        &self.callback_url
    }
}

impl Drop for ListenerLease<'_> {
    fn drop(&mut self) {
        self.registry.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.count())
            .field("listening", &self.is_listening())
            .field("parser", &self.parser)
            .finish()
    }
}
