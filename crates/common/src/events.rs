//! Upload events and their fan-out to push-channel listeners
//!
//! Delivery is best effort: there is no replay buffer, a listener only sees
//! events published after it subscribed, and a listener that falls behind
//! the channel capacity skips what it missed.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::catalog::FileDescriptor;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Something a push-channel client should hear about.
///
/// Serialized untagged, so errors go out as `{"error": ...}` and progress
/// and completion as a bare file descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Error { error: String },
    Progress(FileDescriptor),
    Completed(FileDescriptor),
}

impl RelayEvent {
    pub fn error(message: impl Into<String>) -> Self {
        RelayEvent::Error {
            error: message.into(),
        }
    }
}

/// Cheap, cloneable handle to the process-wide event bus.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<RelayEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to every current subscriber; returns how many got it.
    pub fn publish(&self, event: RelayEvent) -> usize {
        // Err only means nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug)]
pub struct EventSubscriber {
    receiver: broadcast::Receiver<RelayEvent>,
}

impl EventSubscriber {
    /// Next event, or `None` once every broadcaster handle is gone.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, dropping events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
