use soap_client::{SoapError, UpnpFault};
use thiserror::Error;

/// Errors surfaced by action invocation and GENA requests
///
/// Failed actions are never retried; each variant carries what the caller
/// needs to decide whether to try again.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failure or per-call timeout
    #[error("Network error: {0}")]
    Network(String),

    /// The device answered with an HTTP status other than 200 or a SOAP fault
    #[error("Transport error: HTTP {status}")]
    Transport { status: u16, body: String },

    /// UPnP fault returned by the device
    #[error("UPnP fault {}: {}", .0.error_code, .0.error_description)]
    UpnpFault(UpnpFault),

    /// The body could not be decoded; `raw` is kept for diagnostics
    #[error("Unknown response: {raw}")]
    UnknownResponse { raw: String },

    /// A GENA exchange broke protocol (e.g. no SID in the response)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A configuration value was rejected by `validate()`
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// The UPnP fault, if this error is one
    pub fn fault(&self) -> Option<&UpnpFault> {
        match self {
            ApiError::UpnpFault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Whether the device refused the action as unsupported (401/501)
    pub fn is_unsupported(&self) -> bool {
        self.fault().is_some_and(UpnpFault::indicates_unsupported)
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<SoapError> for ApiError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Network(msg) => ApiError::Network(msg),
            SoapError::Transport { status, body } => ApiError::Transport { status, body },
            SoapError::Fault(fault) => ApiError::UpnpFault(fault),
            SoapError::UnknownResponse { raw } => ApiError::UnknownResponse { raw },
            SoapError::MissingHeader(header) => {
                ApiError::Protocol(format!("missing {} header", header))
            }
            SoapError::InvalidRequest(msg) => ApiError::Protocol(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZGT: &str = "urn:schemas-upnp-org:service:ZoneGroupTopology:1";

    #[test]
    fn test_soap_error_conversion() {
        let api_error: ApiError = SoapError::Network("connection timeout".to_string()).into();
        assert!(matches!(api_error, ApiError::Network(_)));

        let api_error: ApiError = SoapError::Transport {
            status: 503,
            body: "busy".to_string(),
        }
        .into();
        assert!(matches!(api_error, ApiError::Transport { status: 503, .. }));

        let api_error: ApiError = SoapError::Fault(UpnpFault::new("501", "", "", ZGT)).into();
        assert!(api_error.is_unsupported());
        assert_eq!(api_error.to_string(), "UPnP fault 501: Action Failed");

        let api_error: ApiError = SoapError::MissingHeader("SID").into();
        assert_eq!(api_error.to_string(), "Protocol error: missing SID header");
    }

    #[test]
    fn test_argument_fault_is_not_unsupported() {
        let api_error: ApiError = SoapError::Fault(UpnpFault::new("402", "", "", ZGT)).into();
        assert!(!api_error.is_unsupported());
        assert_eq!(api_error.fault().map(|f| f.error_code.as_str()), Some("402"));
    }
}
