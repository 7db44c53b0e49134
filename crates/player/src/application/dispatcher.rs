//! Inbound frame routing.
//!
//! Decodes each frame once, drops broadcast ids already seen, applies the
//! display preferences, and hands correlated responses back to the engine.

use hearthlink_shared::{
    decode_server_message, AuthResponse, BroadcastMessage, GameResponse, MessageId, ServerMessage,
};

use super::commands::LocalCommand;
use super::dedup::DedupWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOrigin {
    Player,
    /// Our own message echoed back by the server.
    OwnEcho,
    Server {
        /// Addressed to the current user.
        for_me: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub id: MessageId,
    pub from: String,
    pub text: String,
    pub origin: ChatOrigin,
    pub is_command: bool,
    pub timestamp: Option<String>,
}

/// Where a decoded frame goes next.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Auth(AuthResponse),
    Game(GameResponse),
    ServerError(String),
    Chat(ChatLine),
    Diagnostic(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayPreferences {
    pub hide_others: bool,
    pub debug_overlay: bool,
}

#[derive(Debug)]
pub struct MessageDispatcher {
    dedup: DedupWindow,
    prefs: DisplayPreferences,
}

impl MessageDispatcher {
    pub fn new(dedup: DedupWindow, prefs: DisplayPreferences) -> Self {
        Self { dedup, prefs }
    }

    pub fn preferences(&self) -> DisplayPreferences {
        self.prefs
    }

    /// Flip a local toggle and return its new value.
    pub fn toggle(&mut self, command: LocalCommand) -> bool {
        let flag = match command {
            LocalCommand::HideOthers => &mut self.prefs.hide_others,
            LocalCommand::Debug => &mut self.prefs.debug_overlay,
        };
        *flag = !*flag;
        *flag
    }

    /// Forget every seen id; used when the session ends.
    pub fn clear_history(&mut self) {
        self.dedup.clear();
    }

    pub fn seen_count(&self) -> usize {
        self.dedup.len()
    }

    /// Decode and route one frame.
    pub fn dispatch(&mut self, frame: &str, current_user: Option<&str>) -> Vec<Routed> {
        let mut routed = Vec::new();

        let message = match decode_server_message(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                if self.prefs.debug_overlay {
                    routed.push(Routed::Diagnostic(format!("dropped: {}", e)));
                }
                return routed;
            }
        };

        if self.prefs.debug_overlay {
            routed.push(Routed::Diagnostic(format!("recv {}", message.kind())));
        }

        match message {
            ServerMessage::Auth(auth) => routed.push(Routed::Auth(auth)),
            ServerMessage::Game(game) => routed.push(Routed::Game(game)),
            ServerMessage::ServerError(err) => routed.push(Routed::ServerError(err)),
            ServerMessage::Broadcast(b) => {
                routed.extend(self.route_broadcast(b, current_user).map(Routed::Chat));
            }
            ServerMessage::Poll(batch) => {
                tracing::debug!(count = batch.len(), "Poll batch received");
                for b in batch {
                    routed.extend(self.route_broadcast(b, current_user).map(Routed::Chat));
                }
            }
            ServerMessage::Unknown(_) => {
                tracing::debug!("Ignoring unrecognized frame");
            }
        }

        routed
    }

    fn route_broadcast(
        &mut self,
        b: BroadcastMessage,
        current_user: Option<&str>,
    ) -> Option<ChatLine> {
        if !self.dedup.insert(b.id.clone()) {
            tracing::trace!(id = %b.id, "Duplicate broadcast dropped");
            return None;
        }

        let origin = if b.is_server {
            let for_me = current_user.is_some() && b.target_user.as_deref() == current_user;
            if self.prefs.hide_others && !for_me {
                tracing::trace!(id = %b.id, "Server response for another player hidden");
                return None;
            }
            ChatOrigin::Server { for_me }
        } else if current_user == Some(b.name.as_str()) {
            ChatOrigin::OwnEcho
        } else {
            ChatOrigin::Player
        };

        Some(ChatLine {
            id: b.id,
            from: b.name,
            text: b.msg,
            origin,
            is_command: b.is_command,
            timestamp: b.timestamp,
        })
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new(DedupWindow::default(), DisplayPreferences::default())
    }
}
