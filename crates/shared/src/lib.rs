//! Hearthlink Protocol - wire types for the chat/game server
//!
//! Every frame is a single JSON object. Outbound frames are built from
//! [`ClientMessage`]; inbound frames are decoded exactly once, at the
//! boundary, into the closed [`ServerMessage`] set by [`decode_server_message`].
//!
//! # Design Principles
//!
//! 1. **No business logic** - Pure data types and serialization
//! 2. **Tolerant reads** - Missing optional fields default, unknown shapes are surfaced as `Unknown`
//! 3. **Strict writes** - Outbound field names match what the server parses

pub mod messages;
pub mod obfuscate;
pub mod responses;

pub use messages::{ChatRequest, ClientMessage, GameAction, GameRequest};
pub use obfuscate::{obfuscate_chat, CHAT_XOR_KEY};
pub use responses::{
    decode_server_message, AuthKind, AuthResponse, BroadcastMessage, GameResponse, MessageId,
    ProtocolError, ServerMessage,
};
