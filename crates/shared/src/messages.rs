//! Outbound messages (client -> server)
//!
//! The server multiplexes two request families on the same socket:
//! chat/account requests keyed only by `action`, and game requests that
//! additionally carry `"type": "game"` and the session token.

use serde::{Deserialize, Serialize};

use hearthlink_domain::{EquipSlot, MapId, HEALTH_POTION};

/// Any frame the client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Chat(ChatRequest),
    Game(GameRequest),
}

impl ClientMessage {
    /// Serialize to the single-line JSON text frame the server expects.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short label for logs; never includes credentials or chat text.
    pub fn label(&self) -> &'static str {
        match self {
            ClientMessage::Chat(ChatRequest::Register { .. }) => "register",
            ClientMessage::Chat(ChatRequest::Login { .. }) => "login",
            ClientMessage::Chat(ChatRequest::Poll) => "poll",
            ClientMessage::Chat(ChatRequest::Send { .. }) => "send",
            ClientMessage::Game(req) => req.action.label(),
        }
    }
}

impl From<ChatRequest> for ClientMessage {
    fn from(req: ChatRequest) -> Self {
        ClientMessage::Chat(req)
    }
}

impl From<GameRequest> for ClientMessage {
    fn from(req: GameRequest) -> Self {
        ClientMessage::Game(req)
    }
}

/// Account and chat requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatRequest {
    Register { user: String, pw: String },
    Login { user: String, pw: String },
    /// Ask for recent broadcasts; answered with `poll_response`.
    Poll,
    /// `msg` must already be obfuscated, see [`crate::obfuscate_chat`].
    Send { msg: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestChannel {
    Game,
}

/// A game-service request, authenticated by `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRequest {
    #[serde(rename = "type")]
    pub channel: RequestChannel,
    #[serde(flatten)]
    pub action: GameAction,
    pub token: String,
}

impl GameRequest {
    pub fn new(action: GameAction, token: impl Into<String>) -> Self {
        Self {
            channel: RequestChannel::Game,
            action,
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameAction {
    /// Fetch the current player snapshot.
    Player,
    FindMonster { map: MapId },
    Attack,
    UsePotion { item: String },
    Flee,
    Equip { item: String },
    Unequip { slot: EquipSlot },
}

impl GameAction {
    pub fn use_health_potion() -> Self {
        GameAction::UsePotion {
            item: HEALTH_POTION.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameAction::Player => "player",
            GameAction::FindMonster { .. } => "find_monster",
            GameAction::Attack => "attack",
            GameAction::UsePotion { .. } => "use_potion",
            GameAction::Flee => "flee",
            GameAction::Equip { .. } => "equip",
            GameAction::Unequip { .. } => "unequip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_shape() {
        let msg = ClientMessage::from(ChatRequest::Login {
            user: "ana".into(),
            pw: "pw".into(),
        });
        assert_eq!(
            serde_json::to_value(&msg).expect("serializes"),
            json!({"action": "login", "user": "ana", "pw": "pw"})
        );
    }

    #[test]
    fn test_poll_shape() {
        let msg = ClientMessage::from(ChatRequest::Poll);
        assert_eq!(msg.to_frame().expect("serializes"), r#"{"action":"poll"}"#);
    }

    #[test]
    fn test_find_monster_shape() {
        let msg = ClientMessage::from(GameRequest::new(
            GameAction::FindMonster { map: MapId::SLUM },
            "tok",
        ));
        assert_eq!(
            serde_json::to_value(&msg).expect("serializes"),
            json!({"type": "game", "action": "find_monster", "map": 1, "token": "tok"})
        );
    }

    #[test]
    fn test_unequip_shape() {
        let msg = ClientMessage::from(GameRequest::new(
            GameAction::Unequip {
                slot: EquipSlot::Helmet,
            },
            "tok",
        ));
        assert_eq!(
            serde_json::to_value(&msg).expect("serializes"),
            json!({"type": "game", "action": "unequip", "slot": "helmet", "token": "tok"})
        );
    }

    #[test]
    fn test_use_potion_names_the_potion() {
        let msg = ClientMessage::from(GameRequest::new(GameAction::use_health_potion(), "tok"));
        assert_eq!(
            serde_json::to_value(&msg).expect("serializes")["item"],
            json!("Health Potion")
        );
        assert_eq!(msg.label(), "use_potion");
    }

    #[test]
    fn test_game_frame_reads_back_as_game() {
        let frame = r#"{"type":"game","action":"attack","token":"tok"}"#;
        let msg: ClientMessage = serde_json::from_str(frame).expect("parses");
        assert_eq!(msg, ClientMessage::Game(GameRequest::new(GameAction::Attack, "tok")));
    }
}
