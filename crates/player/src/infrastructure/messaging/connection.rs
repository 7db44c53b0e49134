//! Connection state observation.
//!
//! The driver task owns the engine; everyone else reads the connection state
//! through a shared atomic so status lines never wait on the driver.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::application::ConnectionState;

/// Observable connection state for UI binding.
///
/// Cheap to clone; every clone reads the same underlying state.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    /// Create a new observer from a shared state Arc.
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

/// Internal helper to update connection state (used by the driver).
pub fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) {
    state_ref.store(new_state.to_u8(), Ordering::SeqCst);
}
