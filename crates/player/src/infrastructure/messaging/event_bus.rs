//! Event Bus for pushing session events to the UI.
//!
//! Subscribers register callbacks that the driver invokes, in order, for
//! every [`SessionEvent`] the engine emits.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::application::SessionEvent;

type Subscriber = Box<dyn FnMut(SessionEvent) + Send + 'static>;

/// Event bus for session events.
///
/// The bus holds strong references to subscribers, so they persist until
/// explicitly removed or the bus is dropped.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    /// Create a new EventBus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to all events.
    pub async fn subscribe(&self, callback: impl FnMut(SessionEvent) + Send + 'static) {
        self.subscribers.lock().await.push(Box::new(callback));
    }

    /// Dispatch an event to all subscribers.
    ///
    /// Each subscriber's callback is invoked with a clone of the event.
    pub async fn dispatch(&self, event: SessionEvent) {
        let mut subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter_mut() {
            subscriber(event.clone());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Clear all subscribers.
    pub async fn clear(&self) {
        self.subscribers.lock().await.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
