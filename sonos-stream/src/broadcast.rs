//! Per-subscription fan-out of events

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::event::Event;

/// Delivers each event to every open receiver.
///
/// Delivery is best effort: a receiver created after an event was sent does
/// not see it, and receivers that were dropped are pruned on the next send.
/// Once closed, sends are ignored and new receivers end immediately.
#[derive(Debug)]
pub(crate) struct EventBroadcaster {
    senders: Mutex<Option<Vec<mpsc::UnboundedSender<Event>>>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Some(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(senders) = self.senders.lock().as_mut() {
            senders.push(tx);
        }
        rx
    }

    /// Returns the number of receivers the event reached
    pub fn send(&self, event: &Event) -> usize {
        let mut guard = self.senders.lock();
        let Some(senders) = guard.as_mut() else {
            return 0;
        };
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        senders.len()
    }

    pub fn close(&self) {
        self.senders.lock().take();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.senders.lock().is_none()
    }
}
