//! Routing of inbound NOTIFY requests to subscriptions

use std::sync::Weak;

use tracing::debug;

use crate::event::Event;
use crate::registry::SubscriptionRegistry;

/// What happened to one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the subscription owning the SID
    Delivered,
    /// No active subscription holds the SID
    UnknownSid,
    /// The request carried no `SID` header
    MissingSid,
    /// The body is not a parsable property set
    Malformed,
}

/// Turns raw NOTIFY requests into [`Event`]s for the matching subscription.
///
/// Holds only a weak reference to its registry; once the registry is gone
/// every notification resolves to [`DispatchOutcome::UnknownSid`].
#[derive(Debug, Clone)]
pub struct NotifyDispatcher {
    registry: Weak<SubscriptionRegistry>,
}

impl NotifyDispatcher {
    pub(crate) fn new(registry: Weak<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    pub fn handle_notification(&self, headers: &[(String, String)], body: &str) -> DispatchOutcome {
        let Some(sid) = header(headers, "sid") else {
            debug!("notification without SID");
            return DispatchOutcome::MissingSid;
        };
        let seq = header(headers, "seq")
            .and_then(|seq| seq.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let Some(registry) = self.registry.upgrade() else {
            return DispatchOutcome::UnknownSid;
        };

        let variables = match registry.parser().parse(body) {
            Ok(variables) => variables,
            Err(e) => {
                debug!(sid, error = %e, "discarding unparsable notification");
                return DispatchOutcome::Malformed;
            }
        };

        let Some(subscription) = registry.lookup(sid) else {
            debug!(sid, seq, "notification for unknown subscription");
            return DispatchOutcome::UnknownSid;
        };

        let service_id = subscription.service().info().service_id;
        let event = Event::new(sid, seq, service_id, (*variables).clone());
        debug!(
            seq = event.seq,
            service_id = %event.service_id,
            timestamp = %event.timestamp,
            "event received"
        );
        subscription.send_event(event);
        DispatchOutcome::Delivered
    }
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
