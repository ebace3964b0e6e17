//! Error types for the SOAP client

use thiserror::Error;

use crate::fault::UpnpFault;

/// Errors that can occur during SOAP and GENA communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Connection failure, timeout or other transport-level problem
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The device answered with an HTTP status that is neither 200 nor a SOAP fault
    #[error("HTTP status {status}: {body}")]
    Transport { status: u16, body: String },

    /// UPnP fault returned by the device (HTTP 500 with a decodable fault body)
    #[error(transparent)]
    Fault(#[from] UpnpFault),

    /// Response body could not be understood on either the success or the fault path
    #[error("Unknown response: {raw}")]
    UnknownResponse { raw: String },

    /// A required header was absent from a GENA response
    #[error("Missing {0} header in response")]
    MissingHeader(&'static str),

    /// The request could not be constructed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SoapError {
    pub(crate) fn unknown_response(raw: impl Into<String>) -> Self {
        Self::UnknownResponse { raw: raw.into() }
    }
}
