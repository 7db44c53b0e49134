//! Command Bus for sending intents to the session driver.
//!
//! Every intent carries a oneshot reply. Intents the engine answers at once
//! are replied to immediately; the rest are parked in [`PendingRequests`]
//! until the engine completes them.

use std::collections::HashMap;

use hearthlink_shared::{AuthKind, GameAction};
use tokio::sync::{mpsc, oneshot};

use crate::application::correlator::OperationId;
use crate::application::{OperationOutcome, SessionError, SessionView};

pub type OperationResult = Result<OperationOutcome, SessionError>;

/// Something a caller wants the session to do.
pub enum Intent {
    Connect(String),
    Authenticate {
        kind: AuthKind,
        username: String,
        password: String,
    },
    Chat(String),
    Poll,
    Game(GameAction),
    Logout,
}

impl Intent {
    /// Short label for logs; never includes credentials or chat text.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Connect(_) => "connect",
            Intent::Authenticate {
                kind: AuthKind::Login,
                ..
            } => "login",
            Intent::Authenticate {
                kind: AuthKind::Register,
                ..
            } => "register",
            Intent::Chat(_) => "chat",
            Intent::Poll => "poll",
            Intent::Game(action) => action.label(),
            Intent::Logout => "logout",
        }
    }
}

/// Message types sent through the command bus to the driver.
pub enum BusMessage {
    Intent {
        intent: Intent,
        reply: oneshot::Sender<OperationResult>,
    },
    Snapshot(oneshot::Sender<SessionView>),
}

/// Callers waiting on operations the engine has not finished yet.
#[derive(Default)]
pub struct PendingRequests {
    inner: HashMap<OperationId, oneshot::Sender<OperationResult>>,
}

impl PendingRequests {
    pub fn insert(&mut self, id: OperationId, tx: oneshot::Sender<OperationResult>) {
        self.inner.insert(id, tx);
    }

    /// Resolve a pending request.
    ///
    /// Returns false if nobody is waiting on `id`.
    pub fn resolve(&mut self, id: OperationId, result: OperationResult) -> bool {
        if let Some(tx) = self.inner.remove(&id) {
            if tx.send(result).is_err() {
                tracing::debug!(op = %id, "Caller stopped waiting before completion");
            }
            true
        } else {
            tracing::debug!(op = %id, "Completion for unknown operation");
            false
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every waiter; their receivers observe cancellation.
    pub fn clear(&mut self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        count
    }
}

/// Command bus for sending intents to the driver.
///
/// A concrete struct rather than a trait; clone it freely.
#[derive(Clone)]
pub struct CommandBus {
    tx: mpsc::Sender<BusMessage>,
}

impl CommandBus {
    pub fn new(tx: mpsc::Sender<BusMessage>) -> Self {
        Self { tx }
    }

    /// Submit an intent and wait for its final result.
    pub async fn request(&self, intent: Intent) -> OperationResult {
        let label = intent.label();
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BusMessage::Intent { intent, reply })
            .await
            .map_err(|_| {
                tracing::warn!(intent = label, "Session driver is gone");
                SessionError::Cancelled
            })?;
        rx.await.map_err(|_| SessionError::Cancelled)?
    }

    pub async fn snapshot(&self) -> Result<SessionView, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(BusMessage::Snapshot(reply))
            .await
            .map_err(|_| SessionError::Cancelled)?;
        rx.await.map_err(|_| SessionError::Cancelled)
    }
}
