//! One GENA subscription to one service on one device

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sonos_api::{DeviceAddress, Service};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::broadcast::EventBroadcaster;
use crate::error::{Result, SubscriptionError};
use crate::event::Event;
use crate::registry::SubscriptionRegistry;

/// Where a subscription is in its lifecycle.
///
/// `Unsubscribed` is terminal: a cancelled subscription is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Idle,
    Subscribed,
    Unsubscribed,
}

struct SubscriptionState {
    sid: Option<String>,
    seq: u64,
    timeout: Duration,
    timestamp: Instant,
    status: SubscriptionStatus,
    auto_renew: bool,
    requested_timeout: Option<Duration>,
    renew_task: Option<JoinHandle<()>>,
}

impl SubscriptionState {
    fn time_left(&self) -> Duration {
        match self.status {
            SubscriptionStatus::Subscribed => self.timeout.saturating_sub(self.timestamp.elapsed()),
            _ => Duration::ZERO,
        }
    }
}

pub(crate) struct SubscriptionInner {
    service: Service,
    device: DeviceAddress,
    registry: Arc<SubscriptionRegistry>,
    state: Mutex<SubscriptionState>,
    // Serialises subscribe against cancel; renewals never take it.
    lifecycle: tokio::sync::Mutex<()>,
    events: EventBroadcaster,
}

/// Handle to a GENA subscription.
///
/// Handles are cheap to clone and share one underlying subscription. Dropping
/// the last handle of an active subscription tears it down in the background;
/// [`dispose`](Subscription::dispose) does the same and waits for it.
///
/// ```rust,no_run
/// use sonos_api::{DeviceAddress, Service, SonosClient};
/// use sonos_stream::{StreamConfig, SubscriptionRegistry};
///
/// # async fn demo() -> sonos_stream::Result<()> {
/// let registry = SubscriptionRegistry::new(SonosClient::new()?, StreamConfig::default())?;
/// let device = DeviceAddress::new("192.168.1.100".parse().unwrap());
///
/// let subscription = registry.subscription(device, Service::AVTransport);
/// let mut events = subscription.events();
/// subscription.subscribe(None, true).await?;
///
/// while let Some(event) = events.recv().await {
///     println!("{:?}", event.text("transport_state"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Subscription {
    pub(crate) inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub(crate) fn new(
        registry: Arc<SubscriptionRegistry>,
        device: DeviceAddress,
        service: Service,
    ) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                service,
                device,
                registry,
                state: Mutex::new(SubscriptionState {
                    sid: None,
                    seq: 0,
                    timeout: Duration::ZERO,
                    timestamp: Instant::now(),
                    status: SubscriptionStatus::Idle,
                    auto_renew: false,
                    requested_timeout: None,
                    renew_task: None,
                }),
                lifecycle: tokio::sync::Mutex::new(()),
                events: EventBroadcaster::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SubscriptionInner>) -> Self {
        Self { inner }
    }

    pub fn service(&self) -> Service {
        self.inner.service
    }

    pub fn device(&self) -> &DeviceAddress {
        &self.inner.device
    }

    /// Device-assigned SID, once subscribed
    pub fn sid(&self) -> Option<String> {
        self.inner.state.lock().sid.clone()
    }

    /// Sequence number of the last delivered event
    pub fn seq(&self) -> u64 {
        self.inner.state.lock().seq
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.inner.state.lock().status
    }

    pub fn is_subscribed(&self) -> bool {
        self.status() == SubscriptionStatus::Subscribed
    }

    /// Lease granted by the device on the last subscribe or renew
    pub fn timeout(&self) -> Duration {
        self.inner.state.lock().timeout
    }

    pub fn auto_renew(&self) -> bool {
        self.inner.state.lock().auto_renew
    }

    /// Remaining lease; zero when not subscribed
    pub fn time_left(&self) -> Duration {
        self.inner.state.lock().time_left()
    }

    /// Receiver for events delivered after this call
    pub fn events(&self) -> mpsc::UnboundedReceiver<Event> {
        self.inner.events.subscribe()
    }

    /// Open the subscription.
    ///
    /// `requested_timeout` falls back to the registry's configured lease. With
    /// `auto_renew` the lease is renewed shortly before it runs out, and a
    /// failed renewal cancels the subscription.
    pub async fn subscribe(&self, requested_timeout: Option<Duration>, auto_renew: bool) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        match self.status() {
            SubscriptionStatus::Subscribed => return Err(SubscriptionError::AlreadySubscribed),
            SubscriptionStatus::Unsubscribed => return Err(SubscriptionError::Terminated),
            SubscriptionStatus::Idle => {}
        }

        let registry = &self.inner.registry;
        let requested = requested_timeout.or(registry.config().requested_timeout);
        let lease = registry.ensure_listener().await?;

        let response = match registry
            .client()
            .subscribe(&self.inner.device, self.inner.service, lease.callback_url(), requested)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                drop(lease);
                registry.release_listener_if_idle().await;
                return Err(e.into());
            }
        };

        {
            let mut state = self.inner.state.lock();
            state.sid = Some(response.sid.clone());
            state.seq = 0;
            state.timeout = response.timeout;
            state.timestamp = Instant::now();
            state.status = SubscriptionStatus::Subscribed;
            state.auto_renew = auto_renew;
            state.requested_timeout = requested;
        }
        registry.register(&response.sid, Arc::downgrade(&self.inner));
        drop(lease);

        info!(
            sid = %response.sid,
            service = self.inner.service.name(),
            device = %self.inner.device,
            timeout = ?response.timeout,
            "subscribed"
        );

        if auto_renew {
            self.schedule_renewal(response.timeout);
        }
        Ok(())
    }

    /// Extend the lease using the current SID.
    ///
    /// `is_autorenew` marks a renewal made by the timer: its failure cancels
    /// the subscription. A renewal that completes after cancellation is
    /// discarded and reported as [`SubscriptionError::Terminated`].
    pub async fn renew(&self, requested_timeout: Option<Duration>, is_autorenew: bool) -> Result<()> {
        let result = self.try_renew(requested_timeout).await;
        if let Err(e) = &result {
            if is_autorenew {
                warn!(
                    service = self.inner.service.name(),
                    device = %self.inner.device,
                    error = %e,
                    "automatic renewal failed, cancelling subscription"
                );
                self.cancel_subscription().await;
            }
        }
        result
    }

    async fn try_renew(&self, requested_timeout: Option<Duration>) -> Result<()> {
        let (sid, requested) = {
            let state = self.inner.state.lock();
            match state.status {
                SubscriptionStatus::Idle => return Err(SubscriptionError::NotSubscribed),
                SubscriptionStatus::Unsubscribed => return Err(SubscriptionError::Terminated),
                SubscriptionStatus::Subscribed => {}
            }
            if state.time_left().is_zero() {
                return Err(SubscriptionError::Expired);
            }
            let sid = state.sid.clone().ok_or(SubscriptionError::NotSubscribed)?;
            (sid, requested_timeout.or(state.requested_timeout))
        };

        let registry = &self.inner.registry;
        let response = registry
            .client()
            .renew(&self.inner.device, self.inner.service, &sid, requested)
            .await?;

        let auto_renew = {
            let mut state = self.inner.state.lock();
            if state.status != SubscriptionStatus::Subscribed || state.sid.as_deref() != Some(sid.as_str()) {
                debug!(sid = %sid, "renewal completed after cancellation, discarding");
                return Err(SubscriptionError::Terminated);
            }
            state.timeout = response.timeout;
            state.timestamp = Instant::now();
            // Swapped under the state lock: cancellation reads the sid after
            // marking the subscription terminal, so it always sees the
            // registered one.
            if response.sid != sid {
                state.sid = Some(response.sid.clone());
                registry.unregister(&sid);
                registry.register(&response.sid, Arc::downgrade(&self.inner));
            }
            state.auto_renew
        };

        debug!(sid = %response.sid, timeout = ?response.timeout, "subscription renewed");

        if auto_renew {
            self.schedule_renewal(response.timeout);
        }
        Ok(())
    }

    fn schedule_renewal(&self, timeout: Duration) {
        let delay = self.inner.registry.config().renewal_delay(timeout);
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Detach first so a teardown triggered by this renewal does not
            // abort the task running it.
            inner.state.lock().renew_task.take();
            let subscription = Subscription::from_inner(inner);
            let _ = subscription.renew(None, true).await;
        });

        if let Some(previous) = self.inner.state.lock().renew_task.replace(task) {
            previous.abort();
        }
    }

    /// Deliver an event to every open receiver.
    ///
    /// Events for a subscription that is not active are dropped. Returns the
    /// number of receivers reached.
    pub fn send_event(&self, event: Event) -> usize {
        {
            let mut state = self.inner.state.lock();
            if state.status != SubscriptionStatus::Subscribed {
                return 0;
            }
            state.seq = event.seq;
        }
        self.inner.events.send(&event)
    }

    /// Cancel the subscription. Calling it again does nothing.
    ///
    /// The UNSUBSCRIBE request is best effort; its failure is only logged.
    pub async fn cancel_subscription(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;

        let (sid, was_subscribed) = {
            let mut state = self.inner.state.lock();
            if state.status == SubscriptionStatus::Unsubscribed {
                return;
            }
            let was_subscribed = state.status == SubscriptionStatus::Subscribed;
            state.status = SubscriptionStatus::Unsubscribed;
            if let Some(task) = state.renew_task.take() {
                task.abort();
            }
            (state.sid.clone(), was_subscribed)
        };

        self.inner.events.close();

        let registry = &self.inner.registry;
        if let Some(sid) = sid {
            registry.unregister(&sid);
            if was_subscribed {
                if let Err(e) = registry
                    .client()
                    .unsubscribe(&self.inner.device, self.inner.service, &sid)
                    .await
                {
                    warn!(sid = %sid, error = %e, "unsubscribe failed");
                }
                info!(sid = %sid, service = self.inner.service.name(), "subscription cancelled");
            }
        }

        registry.release_listener_if_idle().await;
    }

    /// Consume the handle and cancel the subscription
    pub async fn dispose(self) {
        self.cancel_subscription().await;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Subscription")
            .field("service", &self.inner.service)
            .field("device", &self.inner.device)
            .field("sid", &state.sid)
            .field("status", &state.status)
            .field("seq", &state.seq)
            .finish()
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(task) = state.renew_task.take() {
            task.abort();
        }
        self.events.close();

        if state.status != SubscriptionStatus::Subscribed {
            return;
        }
        state.status = SubscriptionStatus::Unsubscribed;
        let Some(sid) = state.sid.take() else {
            return;
        };
        self.registry.unregister(&sid);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let registry = Arc::clone(&self.registry);
                let device = self.device.clone();
                let service = self.service;
                handle.spawn(async move {
                    if let Err(e) = registry.client().unsubscribe(&device, service, &sid).await {
                        debug!(sid = %sid, error = %e, "unsubscribe of dropped subscription failed");
                    }
                    registry.release_listener_if_idle().await;
                });
            }
            Err(_) => {
                warn!(sid = %sid, "subscription dropped outside a runtime, leaving it to expire");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventVariables;
    use crate::listener::EventListener;
    use crate::test_support::{gena_registry, ScriptedGena};
    use crate::StreamConfig;

    fn device() -> DeviceAddress {
        DeviceAddress::new("192.168.1.30".parse().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_left_tracks_lease() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);

        assert_eq!(subscription.time_left(), Duration::ZERO);
        subscription.subscribe(None, false).await.unwrap();
        assert_eq!(subscription.status(), SubscriptionStatus::Subscribed);
        assert_eq!(subscription.sid().as_deref(), Some("uuid:RINCON_TEST_sub0000000001"));

        tokio::time::advance(Duration::from_secs(100)).await;
        let left = subscription.time_left();
        assert!(left <= Duration::from_secs(200) && left >= Duration::from_secs(199));

        tokio::time::advance(Duration::from_secs(400)).await;
        assert_eq!(subscription.time_left(), Duration::ZERO);
        assert!(matches!(
            subscription.renew(None, false).await,
            Err(SubscriptionError::Expired)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_errors() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::RenderingControl);

        assert!(matches!(
            subscription.renew(None, false).await,
            Err(SubscriptionError::NotSubscribed)
        ));

        subscription.subscribe(None, false).await.unwrap();
        assert!(matches!(
            subscription.subscribe(None, false).await,
            Err(SubscriptionError::AlreadySubscribed)
        ));

        subscription.cancel_subscription().await;
        assert!(matches!(
            subscription.subscribe(None, false).await,
            Err(SubscriptionError::Terminated)
        ));
        assert!(matches!(
            subscription.renew(None, false).await,
            Err(SubscriptionError::Terminated)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_unregisters_and_is_idempotent() {
        let gena = ScriptedGena::new(300);
        let (registry, listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, false).await.unwrap();

        let sid = subscription.sid().unwrap();
        assert!(registry.lookup(&sid).is_some());
        assert!(listener.is_running());

        subscription.cancel_subscription().await;
        subscription.cancel_subscription().await;

        assert_eq!(subscription.time_left(), Duration::ZERO);
        assert!(registry.lookup(&sid).is_none());
        assert_eq!(registry.count(), 0);
        assert!(!listener.is_running());
        assert_eq!(gena.count("UNSUBSCRIBE"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_dropped_after_cancel() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena, StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, false).await.unwrap();
        let sid = subscription.sid().unwrap();
        let mut events = subscription.events();

        assert_eq!(subscription.send_event(Event::new(&sid, 1, "AVTransport", EventVariables::new())), 1);
        assert_eq!(events.recv().await.unwrap().seq, 1);
        assert_eq!(subscription.seq(), 1);

        subscription.cancel_subscription().await;
        assert_eq!(subscription.send_event(Event::new(&sid, 2, "AVTransport", EventVariables::new())), 0);
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_renew_extends_lease() {
        let gena = ScriptedGena::new(120);
        let config = StreamConfig::default().with_renewal_margin(Duration::from_secs(20));
        let (registry, _listener) = gena_registry(gena.clone(), config);
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, true).await.unwrap();

        tokio::time::sleep(Duration::from_secs(101)).await;
        assert_eq!(gena.count("RENEW"), 1);
        assert!(subscription.is_subscribed());
        assert!(subscription.time_left() > Duration::from_secs(110));

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(gena.count("RENEW"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_renew_failure_tears_down() {
        let gena = ScriptedGena::new(120);
        let config = StreamConfig::default().with_renewal_margin(Duration::from_secs(20));
        let (registry, listener) = gena_registry(gena.clone(), config);
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, true).await.unwrap();
        let sid = subscription.sid().unwrap();
        let mut events = subscription.events();

        gena.fail_renewals();
        tokio::time::sleep(Duration::from_secs(101)).await;

        assert_eq!(subscription.status(), SubscriptionStatus::Unsubscribed);
        assert!(registry.lookup(&sid).is_none());
        assert!(events.recv().await.is_none());
        assert!(!listener.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_renew_failure_surfaces() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, false).await.unwrap();

        gena.fail_renewals();
        assert!(matches!(
            subscription.renew(None, false).await,
            Err(SubscriptionError::Api(_))
        ));
        assert!(subscription.is_subscribed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_with_new_sid_moves_registration() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, false).await.unwrap();
        let old_sid = subscription.sid().unwrap();

        gena.rotate_sids();
        subscription.renew(None, false).await.unwrap();
        let new_sid = subscription.sid().unwrap();

        assert_ne!(old_sid, new_sid);
        assert!(registry.lookup(&old_sid).is_none());
        assert_eq!(registry.lookup(&new_sid).and_then(|s| s.sid()), Some(new_sid));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_completing_after_cancel_is_discarded() {
        let gena = ScriptedGena::new(300);
        let (registry, listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, false).await.unwrap();
        let old_sid = subscription.sid().unwrap();

        gena.rotate_sids();
        gena.delay("RENEW", Duration::from_secs(2));
        let renewing = tokio::spawn({
            let subscription = subscription.clone();
            async move { subscription.renew(None, false).await }
        });
        while gena.count("RENEW") == 0 {
            tokio::task::yield_now().await;
        }

        subscription.cancel_subscription().await;
        assert!(matches!(
            renewing.await.unwrap(),
            Err(SubscriptionError::Terminated)
        ));

        assert_eq!(subscription.status(), SubscriptionStatus::Unsubscribed);
        assert_eq!(subscription.sid(), Some(old_sid));
        assert_eq!(registry.count(), 0);
        assert!(registry.sids().is_empty());
        assert!(!listener.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_renewal() {
        let gena = ScriptedGena::new(120);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, true).await.unwrap();
        subscription.cancel_subscription().await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(gena.count("RENEW"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_unsubscribes() {
        let gena = ScriptedGena::new(300);
        let (registry, listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);
        subscription.subscribe(None, true).await.unwrap();
        let sid = subscription.sid().unwrap();

        drop(subscription);
        assert!(registry.lookup(&sid).is_none());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(gena.count("UNSUBSCRIBE"), 1);
        assert!(!listener.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requested_timeout_falls_back_to_config() {
        let gena = ScriptedGena::new(300);
        let (registry, _listener) = gena_registry(gena.clone(), StreamConfig::default());
        let subscription = registry.subscription(device(), Service::AVTransport);

        subscription.subscribe(None, false).await.unwrap();
        assert_eq!(gena.last_timeout_header().as_deref(), Some("Second-1800"));

        subscription.renew(Some(Duration::from_secs(600)), false).await.unwrap();
        assert_eq!(gena.last_timeout_header().as_deref(), Some("Second-600"));
    }
}
