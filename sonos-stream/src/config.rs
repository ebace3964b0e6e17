//! Configuration types for the sonos-stream crate
//!
//! [`StreamConfig`] controls the NOTIFY listener, the lease requested from
//! devices, and when automatic renewals fire.

use std::net::IpAddr;
use std::time::Duration;

use crate::error::{Result, SubscriptionError};

/// Configuration for a [`SubscriptionRegistry`](crate::SubscriptionRegistry)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Port range for the callback server
    /// Default: (3400, 3500)
    pub callback_port_range: (u16, u16),

    /// Address advertised in the CALLBACK header instead of the detected one
    /// Default: None
    pub advertise_ip: Option<IpAddr>,

    /// Lease requested when `subscribe`/`renew` are called without one.
    /// `None` sends no TIMEOUT header and lets the device choose.
    /// Default: 1800 seconds
    pub requested_timeout: Option<Duration>,

    /// How long before expiry an automatic renewal is sent
    /// Default: 60 seconds
    pub renewal_margin: Duration,

    /// Number of distinct event bodies whose parse result is kept
    /// Default: 256
    pub parse_memo_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            callback_port_range: (3400, 3500),
            advertise_ip: None,
            requested_timeout: Some(Duration::from_secs(1800)),
            renewal_margin: Duration::from_secs(60),
            parse_memo_capacity: 256,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback_port_range(mut self, start: u16, end: u16) -> Self {
        self.callback_port_range = (start, end);
        self
    }

    pub fn with_advertise_ip(mut self, ip: IpAddr) -> Self {
        self.advertise_ip = Some(ip);
        self
    }

    pub fn with_requested_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.requested_timeout = timeout;
        self
    }

    pub fn with_renewal_margin(mut self, margin: Duration) -> Self {
        self.renewal_margin = margin;
        self
    }

    pub fn with_parse_memo_capacity(mut self, capacity: usize) -> Self {
        self.parse_memo_capacity = capacity;
        self
    }

    /// Delay before renewing a lease of `timeout`.
    ///
    /// Normally `timeout - renewal_margin`; when the margin would eat more than
    /// half the lease the renewal happens at the halfway point instead.
    pub fn renewal_delay(&self, timeout: Duration) -> Duration {
        if self.renewal_margin > timeout / 2 {
            timeout / 2
        } else {
            timeout - self.renewal_margin
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.callback_port_range.0 > self.callback_port_range.1 {
            return Err(SubscriptionError::Configuration(
                "Invalid callback port range: start must not exceed end".to_string(),
            ));
        }

        if self.requested_timeout == Some(Duration::ZERO) {
            return Err(SubscriptionError::Configuration(
                "Requested timeout must be greater than 0".to_string(),
            ));
        }

        if self.parse_memo_capacity == 0 {
            return Err(SubscriptionError::Configuration(
                "Parse memo capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
