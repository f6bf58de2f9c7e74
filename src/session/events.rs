//! Session event bus — notifications for the rendering layer.
//!
//! The session owns its log and state exclusively; the UI never mutates
//! them. Instead it subscribes here and reacts to change notifications.

use super::types::{ChatMessage, SessionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A state-change notification from the chat session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A message was appended to the log.
    MessageAppended(ChatMessage),
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A reply is pending; show the typing indicator.
    IndicatorShown,
    /// The pending reply resolved; hide the typing indicator.
    IndicatorHidden,
    /// The log was reset to its welcome entry.
    LogCleared,
}

type ListenerFn = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Listener registry. Emission is synchronous and in subscription order.
pub struct SessionEventBus {
    listeners: RwLock<Vec<(u64, ListenerFn)>>,
    next_listener_id: AtomicU64,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn emit(&self, event: &SessionEvent) {
        let listeners = self.listeners.read().unwrap();
        for (_, listener) in listeners.iter() {
            listener(event);
        }
    }

    /// Subscribe to events. Returns a handle ID for unsubscribing.
    pub fn subscribe(&self, listener: impl Fn(&SessionEvent) + Send + Sync + 'static) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().unwrap().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.listeners.write().unwrap().retain(|(lid, _)| *lid != id);
    }
}
