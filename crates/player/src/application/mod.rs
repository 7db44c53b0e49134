//! Application layer - session protocol logic with no I/O.
//!
//! Everything here is synchronous. The [`engine::SessionEngine`] composes the
//! lifecycle, correlator, dispatcher and combat state machine, and the driver
//! in `infrastructure::websocket` feeds it events and executes its effects.

pub mod combat;
pub mod commands;
pub mod correlator;
pub mod dedup;
pub mod dispatcher;
pub mod effects;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod lifecycle;

pub use effects::{OperationOutcome, SessionEvent, SessionView};
pub use engine::SessionEngine;
pub use error::SessionError;
pub use lifecycle::ConnectionState;
