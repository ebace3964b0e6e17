use thiserror::Error;

/// Errors raised while starting the callback server
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("No available port found in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },

    #[error("Invalid port range {start}-{end}: start must not exceed end")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("Failed to detect local IP address")]
    LocalIpUnavailable,
}

pub type Result<T> = std::result::Result<T, CallbackError>;
