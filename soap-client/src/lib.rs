//! Private SOAP and GENA client for UPnP device communication
//!
//! This crate builds SOAP 1.1 action requests, decodes responses and UPnP
//! faults, and speaks the GENA SUBSCRIBE/UNSUBSCRIBE dialect used for event
//! subscriptions. All traffic goes through an [`HttpTransport`].

mod envelope;
mod error;
mod fault;
mod response;
mod transport;

pub use envelope::{build_command, soap_action, SoapCommand, CONTENT_TYPE};
pub use error::SoapError;
pub use fault::{canonical_description, UpnpFault};
pub use response::{parse_action_response, parse_fault, ActionResponse};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, DEFAULT_TIMEOUT};

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// Lease assumed when neither the device nor the caller names one
pub const DEFAULT_GRANTED_TIMEOUT: Duration = Duration::from_secs(86_400);

/// Response from a SUBSCRIBE (initial or renewal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResponse {
    /// Subscription ID assigned by the device
    pub sid: String,
    /// Lease granted by the device
    pub timeout: Duration,
}

/// SOAP/GENA client over a shared transport
#[derive(Clone)]
pub struct SoapClient {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for SoapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapClient").finish_non_exhaustive()
    }
}

impl SoapClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Client over a [`ReqwestTransport`] with the given per-call timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, SoapError> {
        Ok(Self::new(Arc::new(ReqwestTransport::with_timeout(timeout)?)))
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Invoke `action` and return its output arguments.
    ///
    /// HTTP 200 is decoded as the action response, HTTP 500 as a UPnP fault,
    /// and any other status is a [`SoapError::Transport`].
    pub async fn call(
        &self,
        control_url: &str,
        service_type: &str,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<ActionResponse, SoapError> {
        let command = build_command(control_url, service_type, action, args);
        debug!(url = control_url, action, "sending SOAP action");

        let response = self.transport.send(command.into_request()).await?;
        debug!(action, status = response.status, "SOAP response received");

        match response.status {
            200 => parse_action_response(&response.body, action),
            500 => Err(parse_fault(&response.body, service_type)),
            status => Err(SoapError::Transport {
                status,
                body: response.body,
            }),
        }
    }

    /// Open a new event subscription.
    ///
    /// `timeout` of `None` omits the `TIMEOUT` header and lets the device pick.
    pub async fn subscribe(
        &self,
        event_url: &str,
        callback_url: &str,
        timeout: Option<Duration>,
    ) -> Result<SubscriptionResponse, SoapError> {
        let mut request = HttpRequest::new("SUBSCRIBE", event_url)
            .header("CALLBACK", format!("<{}>", callback_url))
            .header("NT", "upnp:event");
        if let Some(timeout) = timeout {
            request = request.header("TIMEOUT", format_timeout(timeout));
        }

        debug!(url = event_url, callback = callback_url, "sending SUBSCRIBE");
        let response = self.send_gena(request).await?;

        let sid = response
            .header("SID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SoapError::MissingHeader("SID"))?;

        Ok(SubscriptionResponse {
            sid,
            timeout: granted_timeout(&response, timeout),
        })
    }

    /// Renew an existing subscription by SID
    pub async fn renew(
        &self,
        event_url: &str,
        sid: &str,
        timeout: Option<Duration>,
    ) -> Result<SubscriptionResponse, SoapError> {
        let mut request = HttpRequest::new("SUBSCRIBE", event_url).header("SID", sid);
        if let Some(timeout) = timeout {
            request = request.header("TIMEOUT", format_timeout(timeout));
        }

        debug!(url = event_url, sid, "sending renewal SUBSCRIBE");
        let response = self.send_gena(request).await?;

        let sid = response
            .header("SID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| sid.to_string());

        Ok(SubscriptionResponse {
            sid,
            timeout: granted_timeout(&response, timeout),
        })
    }

    /// Cancel a subscription by SID
    pub async fn unsubscribe(&self, event_url: &str, sid: &str) -> Result<(), SoapError> {
        let request = HttpRequest::new("UNSUBSCRIBE", event_url).header("SID", sid);
        debug!(url = event_url, sid, "sending UNSUBSCRIBE");
        self.send_gena(request).await.map(|_| ())
    }

    async fn send_gena(&self, request: HttpRequest) -> Result<HttpResponse, SoapError> {
        let response = self.transport.send(request).await?;
        if response.status != 200 {
            return Err(SoapError::Transport {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }
}

fn format_timeout(timeout: Duration) -> String {
    format!("Second-{}", timeout.as_secs())
}

/// Parse a GENA `TIMEOUT` header value.
///
/// `Second-N` yields `N` seconds. `infinite` has no finite lease and is
/// reported as `None`, as is anything unparseable.
pub fn parse_timeout_header(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (prefix, secs) = value.split_at(value.find('-')? + 1);
    if !prefix.eq_ignore_ascii_case("Second-") {
        return None;
    }
    secs.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn granted_timeout(response: &HttpResponse, requested: Option<Duration>) -> Duration {
    response
        .header("TIMEOUT")
        .and_then(parse_timeout_header)
        .or(requested)
        .unwrap_or(DEFAULT_GRANTED_TIMEOUT)
}
