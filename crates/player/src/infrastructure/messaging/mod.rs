//! Messaging infrastructure between callers and the session driver.
//!
//! - `CommandBus`: send intents to the driver and await their results
//! - `EventBus`: push session events to subscribers
//! - `ConnectionStateObserver`: lock-free view of the connection state

pub mod command_bus;
pub mod connection;
pub mod event_bus;

pub use command_bus::{BusMessage, CommandBus, Intent, OperationResult, PendingRequests};
pub use connection::{set_connection_state, ConnectionStateObserver};
pub use event_bus::EventBus;
