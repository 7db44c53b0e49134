//! Chat input classification.
//!
//! A handful of slash commands only change client preferences and must never
//! reach the server. Every other slash command is the server's business.

/// Client-only toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCommand {
    /// Hide server responses addressed to other players.
    HideOthers,
    /// Show a diagnostic line for every inbound frame.
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Local(LocalCommand),
    /// Text to send, already trimmed.
    Outbound(String),
}

impl ChatInput {
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        match text {
            "" => ChatInput::Empty,
            "/hideothers" => ChatInput::Local(LocalCommand::HideOthers),
            "/debug" => ChatInput::Local(LocalCommand::Debug),
            _ => ChatInput::Outbound(text.to_string()),
        }
    }
}

/// What happened to a line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Ignored,
    /// A local toggle ran; `enabled` is its new value.
    Toggled { command: LocalCommand, enabled: bool },
    Sent,
}
