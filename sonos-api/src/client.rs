use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use soap_client::{
    ActionResponse, HttpTransport, ReqwestTransport, SoapClient, SoapCommand, SoapError,
    SubscriptionResponse,
};
use tracing::{debug, trace};

use crate::cache::{CacheKey, ResponseCache};
use crate::{ApiError, DeviceAddress, InvokerConfig, Result, Service};

/// Entry point for talking to Sonos devices
///
/// A `SonosClient` owns the HTTP transport and a response cache shared by
/// every [`ActionInvoker`] it hands out, and also issues the GENA requests
/// used by event subscriptions.
///
/// ```rust,no_run
/// use sonos_api::{DeviceAddress, Service, SonosClient};
///
/// # async fn demo() -> sonos_api::Result<()> {
/// let client = SonosClient::new()?;
/// let device = DeviceAddress::new("192.168.1.100".parse().unwrap());
/// let topology = client.invoker(device, Service::ZoneGroupTopology);
/// let state = topology.send_command("GetZoneGroupState", &[], true).await?;
/// println!("{}", state["ZoneGroupState"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SonosClient {
    soap: SoapClient,
    cache: Arc<ResponseCache>,
    config: InvokerConfig,
}

impl SonosClient {
    /// Client over the default reqwest transport
    pub fn new() -> Result<Self> {
        Self::with_config(InvokerConfig::default())
    }

    pub fn with_config(config: InvokerConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::with_timeout(config.timeout)?;
        Ok(Self::build(Arc::new(transport), config))
    }

    /// Client over a caller-supplied transport
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: InvokerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: Arc<dyn HttpTransport>, config: InvokerConfig) -> Self {
        Self {
            soap: SoapClient::new(transport),
            cache: Arc::new(ResponseCache::new(config.cache_ttl)),
            config,
        }
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Invoker bound to one service on one device
    pub fn invoker(&self, device: DeviceAddress, service: Service) -> ActionInvoker {
        ActionInvoker {
            client: self.clone(),
            device,
            service,
        }
    }

    /// Drop every cached response
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Open a GENA subscription on `service` of `device`
    pub async fn subscribe(
        &self,
        device: &DeviceAddress,
        service: Service,
        callback_url: &str,
        timeout: Option<Duration>,
    ) -> Result<SubscriptionResponse> {
        let url = device.event_url(service);
        self.bounded(self.soap.subscribe(&url, callback_url, timeout))
            .await
    }

    /// Renew a GENA subscription by SID
    pub async fn renew(
        &self,
        device: &DeviceAddress,
        service: Service,
        sid: &str,
        timeout: Option<Duration>,
    ) -> Result<SubscriptionResponse> {
        let url = device.event_url(service);
        self.bounded(self.soap.renew(&url, sid, timeout)).await
    }

    /// Cancel a GENA subscription by SID
    pub async fn unsubscribe(
        &self,
        device: &DeviceAddress,
        service: Service,
        sid: &str,
    ) -> Result<()> {
        let url = device.event_url(service);
        self.bounded(self.soap.unsubscribe(&url, sid)).await
    }

    async fn bounded<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, SoapError>>,
    {
        match tokio::time::timeout(self.config.timeout, request).await {
            Ok(result) => result.map_err(ApiError::from),
            Err(_) => Err(ApiError::Network(format!(
                "request timed out after {:?}",
                self.config.timeout
            ))),
        }
    }
}

/// Sends SOAP actions to one service on one device
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    client: SonosClient,
    device: DeviceAddress,
    service: Service,
}

impl ActionInvoker {
    pub fn device(&self) -> &DeviceAddress {
        &self.device
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn control_url(&self) -> String {
        self.device.control_url(self.service)
    }

    /// Build the request for `action` without sending it
    pub fn build_command(&self, action: &str, args: &[(&str, &str)]) -> SoapCommand {
        soap_client::build_command(
            &self.control_url(),
            &self.service.service_type_urn(),
            action,
            args,
        )
    }

    /// Invoke `action` and return its output arguments in document order.
    ///
    /// With `use_cache` set (and caching enabled on the client) an identical
    /// call made within the cache TTL is answered without contacting the
    /// device. Failures are never cached and never retried.
    pub async fn send_command(
        &self,
        action: &str,
        args: &[(&str, &str)],
        use_cache: bool,
    ) -> Result<ActionResponse> {
        let endpoint = self.control_url();
        let caching = use_cache && self.client.config.cache_enabled;

        let key = caching.then(|| CacheKey::new(&endpoint, action, args));
        if let Some(key) = &key {
            if let Some(hit) = self.client.cache.get(key) {
                trace!(action, device = %self.device, "action served from cache");
                return Ok(hit);
            }
        }

        debug!(action, service = self.service.name(), device = %self.device, "invoking action");
        let service_type = self.service.service_type_urn();
        let response = self
            .client
            .bounded(self.client.soap.call(&endpoint, &service_type, action, args))
            .await?;

        if let Some(key) = key {
            self.client.cache.insert(key, response.clone());
        }
        Ok(response)
    }

    /// Drop every cached response of the owning client
    pub fn clear_cache(&self) {
        self.client.clear_cache();
    }
}
