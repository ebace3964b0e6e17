//! Error types for the sonos-stream crate.

use sonos_api::ApiError;

/// Errors from subscription operations.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// `subscribe` was called on a subscription that is already active
    #[error("Subscription is already active")]
    AlreadySubscribed,

    /// The subscription was cancelled; create a new one instead
    #[error("Subscription has been terminated")]
    Terminated,

    /// `renew` was called before a successful `subscribe`
    #[error("Subscription has not been established")]
    NotSubscribed,

    /// The lease ran out before it was renewed
    #[error("Subscription expired")]
    Expired,

    /// The device request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The NOTIFY listener could not be started
    #[error("Listener error: {0}")]
    Listener(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from event body parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed event XML: {0}")]
    Xml(String),

    #[error("Expected a propertyset, found <{0}>")]
    NotPropertySet(String),

    #[error("Malformed LastChange: {0}")]
    LastChange(String),
}

/// Convenience type alias for Results using SubscriptionError.
pub type Result<T> = std::result::Result<T, SubscriptionError>;
