//! Infrastructure adapters: real clock, websocket transport, and the driver
//! that wires the session engine to them.

pub mod clock;
pub mod messaging;
pub mod websocket;

pub use clock::SystemClock;
pub use messaging::{ConnectionStateObserver, EventBus};
pub use websocket::{create_session, SessionClient, SessionParts, TungsteniteConnector};
