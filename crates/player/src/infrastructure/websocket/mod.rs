//! WebSocket transport and the session driver
//!
//! - `desktop`: tokio-tungstenite implementation of the transport port
//! - `bridge`: the driver task that runs the session engine
//! - `session_client`: the handle callers use to talk to the driver

mod bridge;
mod desktop;
mod session_client;

pub use bridge::{create_session, SessionParts};
pub use desktop::{TungsteniteChannel, TungsteniteConnector};
pub use session_client::SessionClient;
