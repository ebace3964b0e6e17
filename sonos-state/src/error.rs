//! Error types for sonos-state

use sonos_api::ApiError;

/// Result type for sonos-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while maintaining the zone topology
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The topology payload could not be parsed; the live model is unchanged
    #[error("Parse error: {0}")]
    Parse(String),

    /// The device does not implement the polled action
    #[error("{action} is not supported by {device} (UPnP error {code})")]
    NotSupported {
        action: &'static str,
        device: String,
        code: String,
    },

    /// Error from sonos-api
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StateError::NotSupported {
            action: "GetZoneGroupState",
            device: "10.0.0.5:1400".to_string(),
            code: "401".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "GetZoneGroupState is not supported by 10.0.0.5:1400 (UPnP error 401)"
        );

        let err = StateError::from(ApiError::Network("refused".to_string()));
        assert_eq!(err.to_string(), "API error: Network error: refused");
    }
}
