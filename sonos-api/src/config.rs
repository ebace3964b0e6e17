//! Configuration for action invocation

use std::time::Duration;

use crate::{ApiError, Result};

/// Configuration for [`SonosClient`](crate::SonosClient) and the invokers it creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokerConfig {
    /// Upper bound on a single action or GENA request
    /// Default: 5 seconds
    pub timeout: Duration,

    /// Whether `send_command(.., use_cache = true)` consults the response cache
    /// Default: true
    pub cache_enabled: bool,

    /// How long a cached response stays valid
    /// Default: 1 second
    pub cache_ttl: Duration,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout: soap_client::DEFAULT_TIMEOUT,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(1),
        }
    }
}

impl InvokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.timeout == Duration::ZERO {
            return Err(ApiError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.cache_enabled && self.cache_ttl == Duration::ZERO {
            return Err(ApiError::InvalidConfig(
                "Cache TTL must be greater than 0 when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }
}
