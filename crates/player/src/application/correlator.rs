//! Request correlation.
//!
//! The protocol carries no request ids, so a response is matched to the
//! oldest outstanding request of its kind. Allowing at most one outstanding
//! request per kind makes that match unambiguous.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use hearthlink_shared::{AuthKind, GameAction};

use super::error::SessionError;

/// Identifies one caller-visible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(Uuid);

impl OperationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation slot. One request of each kind may be outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Auth,
    CombatAction,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Auth => f.write_str("auth"),
            OperationKind::CombatAction => f.write_str("combat_action"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRequest {
    Auth { kind: AuthKind, username: String },
    Game(GameAction),
}

impl PendingRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingRequest::Auth { .. } => OperationKind::Auth,
            PendingRequest::Game(_) => OperationKind::CombatAction,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub id: OperationId,
    pub issued_at: DateTime<Utc>,
    pub request: PendingRequest,
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        self.request.kind()
    }
}

/// Tracks outstanding correlated requests keyed by kind.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    slots: HashMap<OperationKind, PendingOperation>,
}

impl RequestCorrelator {
    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn pending(&self, kind: OperationKind) -> Option<&PendingOperation> {
        self.slots.get(&kind)
    }

    /// Register a request. Fails without touching the existing entry when the
    /// kind's slot is occupied.
    pub fn issue(
        &mut self,
        request: PendingRequest,
        issued_at: DateTime<Utc>,
    ) -> Result<OperationId, SessionError> {
        let kind = request.kind();
        if self.slots.contains_key(&kind) {
            return Err(SessionError::OperationInProgress);
        }
        let id = OperationId::new();
        self.slots.insert(
            kind,
            PendingOperation {
                id,
                issued_at,
                request,
            },
        );
        Ok(id)
    }

    /// Remove and return the outstanding request of `kind`.
    pub fn take(&mut self, kind: OperationKind) -> Option<PendingOperation> {
        self.slots.remove(&kind)
    }

    /// Remove `id` only if it is still the outstanding request of `kind`.
    pub fn take_if(&mut self, kind: OperationKind, id: OperationId) -> Option<PendingOperation> {
        if self.slots.get(&kind).is_some_and(|op| op.id == id) {
            self.slots.remove(&kind)
        } else {
            None
        }
    }

    /// Remove every outstanding request.
    pub fn drain(&mut self) -> Vec<PendingOperation> {
        self.slots.drain().map(|(_, op)| op).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(user: &str) -> PendingRequest {
        PendingRequest::Auth {
            kind: AuthKind::Login,
            username: user.into(),
        }
    }

    #[test]
    fn test_second_issue_of_same_kind_is_refused() {
        let mut correlator = RequestCorrelator::default();
        let first = correlator.issue(login("ana"), Utc::now()).expect("slot free");
        assert_eq!(
            correlator.issue(login("bob"), Utc::now()),
            Err(SessionError::OperationInProgress)
        );
        let pending = correlator
            .pending(OperationKind::Auth)
            .expect("first still pending");
        assert_eq!(pending.id, first);
        assert_eq!(pending.request, login("ana"));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut correlator = RequestCorrelator::default();
        correlator.issue(login("ana"), Utc::now()).expect("auth slot");
        correlator
            .issue(PendingRequest::Game(GameAction::Attack), Utc::now())
            .expect("combat slot");
        assert_eq!(correlator.len(), 2);
    }

    #[test]
    fn test_take_frees_slot() {
        let mut correlator = RequestCorrelator::default();
        correlator
            .issue(PendingRequest::Game(GameAction::Attack), Utc::now())
            .expect("slot free");
        assert!(correlator.take(OperationKind::CombatAction).is_some());
        assert!(correlator.take(OperationKind::CombatAction).is_none());
        assert!(correlator
            .issue(PendingRequest::Game(GameAction::Flee), Utc::now())
            .is_ok());
    }

    #[test]
    fn test_take_if_ignores_stale_id() {
        let mut correlator = RequestCorrelator::default();
        correlator
            .issue(PendingRequest::Game(GameAction::Attack), Utc::now())
            .expect("slot free");
        assert!(correlator
            .take_if(OperationKind::CombatAction, OperationId::new())
            .is_none());
        assert!(correlator.is_pending(OperationKind::CombatAction));
    }

    #[test]
    fn test_drain_empties_everything() {
        let mut correlator = RequestCorrelator::default();
        correlator.issue(login("ana"), Utc::now()).expect("auth slot");
        correlator
            .issue(PendingRequest::Game(GameAction::Attack), Utc::now())
            .expect("combat slot");
        assert_eq!(correlator.drain().len(), 2);
        assert!(correlator.is_empty());
    }
}
