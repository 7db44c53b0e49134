//! Hearthlink Player crate.
//!
//! A client for a persistent-connection chat and combat server:
//! - `application`: the sans-IO session engine and its parts
//! - `ports`: the transport and clock seams
//! - `infrastructure`: the websocket adapter and the tokio driver
//! - `runner`: the terminal front end used by the binary

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod runner;

pub use application::{ConnectionState, SessionError, SessionEvent, SessionView};
pub use config::ClientConfig;
pub use infrastructure::{create_session, SessionClient, SessionParts};
