//! Inbound messages (server -> client)
//!
//! The server does not tag its frames uniformly, so classification is by
//! shape: first the `action` discriminator used by account responses, then
//! the presence of `id` (broadcast), `success` (game response) or `error`.
//! Anything else decodes to [`ServerMessage::Unknown`] so that newer servers
//! never break older clients.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use hearthlink_domain::{AccountStats, EnemySnapshot, PlayerSnapshot};

/// Frame could not be turned into a [`ServerMessage`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed JSON frame: {0}")]
    Malformed(String),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Invalid {kind} frame: {detail}")]
    InvalidShape { kind: &'static str, detail: String },
}

/// Broadcast id. The server uses a numeric counter; relays have been seen
/// forwarding it as a string, so both are accepted and kept distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(u64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{}", n),
            MessageId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for MessageId {
    fn from(n: u64) -> Self {
        MessageId::Number(n)
    }
}

/// Chat line or server announcement fanned out to every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub id: MessageId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub is_server: bool,
    #[serde(default)]
    pub is_command: bool,
    #[serde(default)]
    pub target_user: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthKind {
    #[serde(rename = "register_response")]
    Register,
    #[serde(rename = "login_response")]
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "action")]
    pub kind: AuthKind,
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub stats: Option<AccountStats>,
    /// Game-service token. Servers that predate tokens omit it and accept
    /// the username instead.
    #[serde(default)]
    pub token: Option<String>,
}

/// Reply to any `{"type": "game"}` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameResponse {
    pub success: bool,
    pub error: Option<String>,
    pub player: Option<PlayerSnapshot>,
    pub monster: Option<EnemySnapshot>,
    pub player_damage: Option<u32>,
    pub enemy_damage: Option<u32>,
    pub enemy_defeated: bool,
    pub player_defeated: bool,
    pub exp_gained: Option<u64>,
    pub gold_gained: Option<u64>,
    pub dropped_items: Vec<String>,
    pub level_up: bool,
    pub healed: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PollPayload {
    #[serde(default)]
    messages: Vec<BroadcastMessage>,
}

/// Every frame the client understands, plus a catch-all.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Auth(AuthResponse),
    Poll(Vec<BroadcastMessage>),
    Broadcast(BroadcastMessage),
    Game(GameResponse),
    /// Bare `{"error": ...}` frame, usually a rejected request.
    ServerError(String),
    Unknown(Value),
}

impl ServerMessage {
    /// Classification name for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Auth(AuthResponse {
                kind: AuthKind::Register,
                ..
            }) => "register_response",
            ServerMessage::Auth(AuthResponse {
                kind: AuthKind::Login,
                ..
            }) => "login_response",
            ServerMessage::Poll(_) => "poll_response",
            ServerMessage::Broadcast(_) => "broadcast",
            ServerMessage::Game(_) => "game_response",
            ServerMessage::ServerError(_) => "error",
            ServerMessage::Unknown(_) => "unknown",
        }
    }
}

/// Decode one text frame.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    match obj.get("action").and_then(Value::as_str) {
        Some("register_response") | Some("login_response") => {
            return shaped(obj, "auth").map(ServerMessage::Auth);
        }
        Some("poll_response") => {
            return shaped::<PollPayload>(obj, "poll").map(|p| ServerMessage::Poll(p.messages));
        }
        _ => {}
    }

    if obj.contains_key("id") {
        return shaped(obj, "broadcast").map(ServerMessage::Broadcast);
    }
    if obj.contains_key("success") {
        return shaped(obj, "game").map(ServerMessage::Game);
    }
    if let Some(error) = obj.get("error") {
        let text = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Ok(ServerMessage::ServerError(text));
    }

    tracing::debug!(keys = ?obj.keys().collect::<Vec<_>>(), "Unrecognized server frame");
    Ok(ServerMessage::Unknown(Value::Object(obj)))
}

fn shaped<T: DeserializeOwned>(
    obj: Map<String, Value>,
    kind: &'static str,
) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(obj)).map_err(|e| ProtocolError::InvalidShape {
        kind,
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response() {
        let msg = decode_server_message(
            r#"{"action":"login_response","ok":true,"stats":{"level":4},"token":"abc"}"#,
        )
        .expect("decodes");
        let ServerMessage::Auth(auth) = msg else {
            panic!("expected auth, got {:?}", msg);
        };
        assert_eq!(auth.kind, AuthKind::Login);
        assert!(auth.ok);
        assert_eq!(auth.token.as_deref(), Some("abc"));
        assert_eq!(auth.stats.map(|s| s.level), Some(4));
    }

    #[test]
    fn test_register_failure_keeps_message() {
        let msg = decode_server_message(
            r#"{"action":"register_response","ok":false,"msg":"User exists"}"#,
        )
        .expect("decodes");
        assert_eq!(msg.kind(), "register_response");
        let ServerMessage::Auth(auth) = msg else {
            panic!("expected auth");
        };
        assert!(!auth.ok);
        assert_eq!(auth.msg.as_deref(), Some("User exists"));
    }

    #[test]
    fn test_poll_response_in_order() {
        let msg = decode_server_message(
            r#"{"action":"poll_response","messages":[{"id":1,"name":"a","msg":"x"},{"id":"2","name":"b","msg":"y"}]}"#,
        )
        .expect("decodes");
        let ServerMessage::Poll(batch) = msg else {
            panic!("expected poll");
        };
        let ids: Vec<MessageId> = batch.into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![MessageId::Number(1), MessageId::Text("2".into())]);
    }

    #[test]
    fn test_broadcast_camel_case() {
        let msg = decode_server_message(
            r#"{"id":9,"name":"Server","msg":"hi","isServer":true,"isCommand":false,"targetUser":"ana","timestamp":"2024-01-01T00:00:00"}"#,
        )
        .expect("decodes");
        let ServerMessage::Broadcast(b) = msg else {
            panic!("expected broadcast");
        };
        assert!(b.is_server);
        assert_eq!(b.target_user.as_deref(), Some("ana"));
    }

    #[test]
    fn test_attack_response() {
        let msg = decode_server_message(
            r#"{"success":true,"playerDamage":5,"enemyDamage":3,"enemyDefeated":false}"#,
        )
        .expect("decodes");
        let ServerMessage::Game(g) = msg else {
            panic!("expected game");
        };
        assert_eq!(g.player_damage, Some(5));
        assert_eq!(g.enemy_damage, Some(3));
        assert!(g.player.is_none());
        assert!(g.dropped_items.is_empty());
    }

    #[test]
    fn test_bare_error() {
        assert_eq!(
            decode_server_message(r#"{"error":"Invalid token"}"#),
            Ok(ServerMessage::ServerError("Invalid token".into()))
        );
    }

    #[test]
    fn test_unknown_shape() {
        let msg = decode_server_message(r#"{"hello":"world"}"#).expect("decodes");
        assert_eq!(msg.kind(), "unknown");
    }

    #[test]
    fn test_malformed_frames() {
        assert!(matches!(
            decode_server_message("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert_eq!(
            decode_server_message("[1,2]"),
            Err(ProtocolError::NotAnObject)
        );
        assert!(matches!(
            decode_server_message(r#"{"success":"yes"}"#),
            Err(ProtocolError::InvalidShape { kind: "game", .. })
        ));
    }
}
