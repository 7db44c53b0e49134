//! Instructions the engine hands to its driver, and what callers get back.

use std::collections::HashMap;
use std::time::Duration;

use hearthlink_domain::{AccountStats, EnemySnapshot, PlayerSnapshot};

use super::combat::CombatOutcome;
use super::commands::ChatOutcome;
use super::correlator::{OperationId, OperationKind};
use super::dispatcher::{ChatLine, DisplayPreferences};
use super::error::SessionError;
use super::lifecycle::ConnectionState;
use crate::ports::outbound::ConnectionEpoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    ConnectDeadline,
    Reconnect,
    Operation(OperationKind),
}

/// At most one live timer per key. Re-arming a key supersedes the old timer;
/// a fire whose sequence number is no longer current is stale.
#[derive(Debug, Default)]
pub struct TimerTable {
    next_seq: u64,
    armed: HashMap<TimerKey, u64>,
}

impl TimerTable {
    pub fn arm(&mut self, key: TimerKey) -> u64 {
        self.next_seq += 1;
        self.armed.insert(key, self.next_seq);
        self.next_seq
    }

    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.armed.remove(&key).is_some()
    }

    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.armed.contains_key(&key)
    }

    /// Consume a fire. Returns false for stale or cancelled timers.
    pub fn fire(&mut self, key: TimerKey, seq: u64) -> bool {
        if self.armed.get(&key) == Some(&seq) {
            self.armed.remove(&key);
            true
        } else {
            false
        }
    }

    /// Disarm everything, returning the keys that were live.
    pub fn clear(&mut self) -> Vec<TimerKey> {
        self.armed.drain().map(|(key, _)| key).collect()
    }
}

/// Successful completion of a caller-visible operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Connected,
    LoggedIn {
        username: String,
        stats: AccountStats,
    },
    /// Registration does not log in; `message` is the server's text, if any.
    Registered {
        message: Option<String>,
    },
    LoggedOut,
    Chat(ChatOutcome),
    PollRequested,
    Combat(CombatOutcome),
}

/// What an intent returns synchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ticket {
    Done(OperationOutcome),
    /// Resolved later by an [`Effect::Complete`] carrying this id.
    Pending(OperationId),
}

/// Pushed to UI subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Connected { reconnected: bool },
    ConnectFailed(SessionError),
    ConnectionLost,
    ReconnectScheduled { attempt: u32, delay: Duration },
    ReconnectExhausted,
    Disconnected,
    Authenticated { username: String },
    LoggedOut,
    Chat(ChatLine),
    PlayerUpdated(PlayerSnapshot),
    /// Status line, e.g. a local toggle or an unsolicited server error.
    Notice(String),
    Diagnostic(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenTransport {
        url: String,
        epoch: ConnectionEpoch,
    },
    SendFrame {
        frame: String,
        /// Operation to fail if the frame cannot be sent.
        op: Option<OperationId>,
    },
    CloseTransport {
        epoch: ConnectionEpoch,
    },
    ArmTimer {
        key: TimerKey,
        seq: u64,
        after: Duration,
    },
    CancelTimer {
        key: TimerKey,
    },
    Complete {
        op: OperationId,
        result: Result<OperationOutcome, SessionError>,
    },
    Notify(SessionEvent),
}

/// Read-only snapshot of the whole session for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub state: ConnectionState,
    pub url: Option<String>,
    pub username: Option<String>,
    pub stats: Option<AccountStats>,
    pub player: Option<PlayerSnapshot>,
    pub enemy: Option<EnemySnapshot>,
    pub preferences: DisplayPreferences,
    pub reconnect_attempt: u32,
    pub auth_pending: bool,
    pub combat_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_supersedes() {
        let mut timers = TimerTable::default();
        let first = timers.arm(TimerKey::Reconnect);
        let second = timers.arm(TimerKey::Reconnect);
        assert!(!timers.fire(TimerKey::Reconnect, first));
        assert!(timers.fire(TimerKey::Reconnect, second));
        assert!(!timers.is_armed(TimerKey::Reconnect));
    }

    #[test]
    fn test_cancelled_fire_is_stale() {
        let mut timers = TimerTable::default();
        let seq = timers.arm(TimerKey::ConnectDeadline);
        assert!(timers.cancel(TimerKey::ConnectDeadline));
        assert!(!timers.fire(TimerKey::ConnectDeadline, seq));
    }

    #[test]
    fn test_clear_returns_live_keys() {
        let mut timers = TimerTable::default();
        timers.arm(TimerKey::ConnectDeadline);
        timers.arm(TimerKey::Operation(OperationKind::Auth));
        assert_eq!(timers.clear().len(), 2);
        assert!(!timers.is_armed(TimerKey::ConnectDeadline));
    }
}
