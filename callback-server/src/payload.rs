//! The unparsed notification handed from the HTTP layer to its consumer.

/// A NOTIFY request as received, with no device-specific interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Request path the device posted to
    pub path: String,
    /// All request headers, in arrival order
    pub headers: Vec<(String, String)>,
    /// Raw XML body
    pub body: String,
}

impl NotificationPayload {
    pub fn new(path: impl Into<String>, headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers,
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The subscription ID from the `SID` header
    pub fn subscription_id(&self) -> Option<&str> {
        self.header("sid")
    }
}
