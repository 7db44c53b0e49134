//! Caller-facing handle to a running session.

use hearthlink_domain::{AccountStats, EquipSlot, MapId};
use hearthlink_shared::{AuthKind, GameAction};

use crate::application::combat::CombatOutcome;
use crate::application::commands::ChatOutcome;
use crate::application::endpoint::normalize_server_url;
use crate::application::{OperationOutcome, SessionError, SessionView};
use crate::infrastructure::messaging::{CommandBus, Intent};

/// Cloneable; every clone talks to the same driver.
#[derive(Clone)]
pub struct SessionClient {
    bus: CommandBus,
}

impl SessionClient {
    pub fn new(bus: CommandBus) -> Self {
        Self { bus }
    }

    /// Connect to `server`, given as typed by the user.
    pub async fn connect(&self, server: &str) -> Result<(), SessionError> {
        let url = normalize_server_url(server)?;
        match self.bus.request(Intent::Connect(url)).await? {
            OperationOutcome::Connected => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Connect if needed, then log in.
    pub async fn login(
        &self,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<AccountStats, SessionError> {
        self.connect(server).await?;
        let outcome = self
            .bus
            .request(Intent::Authenticate {
                kind: AuthKind::Login,
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        match outcome {
            OperationOutcome::LoggedIn { stats, .. } => Ok(stats),
            other => Err(unexpected(other)),
        }
    }

    /// Connect if needed, then register. Does not log in; returns the
    /// server's message, if any.
    pub async fn register(
        &self,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, SessionError> {
        self.connect(server).await?;
        let outcome = self
            .bus
            .request(Intent::Authenticate {
                kind: AuthKind::Register,
                username: username.to_string(),
                password: password.to_string(),
            })
            .await?;
        match outcome {
            OperationOutcome::Registered { message } => Ok(message),
            other => Err(unexpected(other)),
        }
    }

    pub async fn send_chat(&self, text: &str) -> Result<ChatOutcome, SessionError> {
        match self.bus.request(Intent::Chat(text.to_string())).await? {
            OperationOutcome::Chat(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn poll(&self) -> Result<(), SessionError> {
        self.bus.request(Intent::Poll).await.map(|_| ())
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        self.bus.request(Intent::Logout).await.map(|_| ())
    }

    pub async fn find_monster(&self, map: MapId) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::FindMonster { map }).await
    }

    pub async fn attack(&self) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::Attack).await
    }

    pub async fn use_potion(&self) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::use_health_potion()).await
    }

    /// Always leaves the battle locally, even if the server never answers.
    pub async fn flee(&self) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::Flee).await
    }

    pub async fn equip(&self, item: &str) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::Equip {
            item: item.to_string(),
        })
        .await
    }

    pub async fn unequip(&self, slot: EquipSlot) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::Unequip { slot }).await
    }

    pub async fn refresh_player(&self) -> Result<CombatOutcome, SessionError> {
        self.game(GameAction::Player).await
    }

    pub async fn snapshot(&self) -> Result<SessionView, SessionError> {
        self.bus.snapshot().await
    }

    async fn game(&self, action: GameAction) -> Result<CombatOutcome, SessionError> {
        match self.bus.request(Intent::Game(action)).await? {
            OperationOutcome::Combat(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(outcome: OperationOutcome) -> SessionError {
    tracing::error!(?outcome, "Operation completed with the wrong outcome type");
    SessionError::invalid_state("unexpected operation outcome")
}
