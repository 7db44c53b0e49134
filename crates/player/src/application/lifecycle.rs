//! Connection lifecycle state machine.
//!
//! Pure bookkeeping: which state the connection is in, which epoch is
//! current, and how far reconnection has progressed. The engine decides when
//! to call each transition and turns the results into effects.

use std::time::Duration;

use crate::ports::outbound::ConnectionEpoch;

/// Connection state as observed by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    /// Connection lost; waiting out the backoff delay before the next attempt.
    Reconnecting,
    /// Explicit close requested; waiting for the transport to confirm.
    Closing,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::Closing => 4,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::Closing,
            _ => ConnectionState::Idle,
        }
    }

    /// True while a connect or reconnect is underway or a close is pending.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting | ConnectionState::Closing
        )
    }
}

/// Linear backoff: attempt `n` waits `base * n`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    base_delay: Duration,
    max_attempts: u32,
}

impl BackoffState {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_attempts,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None`
    /// once every attempt has been used.
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }
}

/// Outcome of asking for another reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Scheduled { attempt: u32, delay: Duration },
    Exhausted,
}

#[derive(Debug)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    url: Option<String>,
    epoch: ConnectionEpoch,
    backoff: BackoffState,
}

impl ConnectionLifecycle {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Idle,
            url: None,
            epoch: ConnectionEpoch::default(),
            backoff: BackoffState::new(base_delay, max_attempts),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    /// Events from any other epoch belong to an abandoned socket.
    pub fn is_current(&self, epoch: ConnectionEpoch) -> bool {
        epoch == self.epoch
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.backoff.attempts()
    }

    /// True when the pending open was started by the reconnect timer rather
    /// than by a caller.
    pub fn is_reconnect_attempt(&self) -> bool {
        self.state == ConnectionState::Connecting && self.backoff.attempts() > 0
    }

    /// Idle -> Connecting for a caller-initiated connect.
    pub fn begin_connect(&mut self, url: String) -> ConnectionEpoch {
        debug_assert_eq!(self.state, ConnectionState::Idle);
        self.backoff.reset();
        self.url = Some(url);
        self.epoch = self.epoch.next();
        self.state = ConnectionState::Connecting;
        self.epoch
    }

    /// Reconnecting -> Connecting once the backoff delay has elapsed.
    pub fn begin_reconnect_attempt(&mut self) -> Option<(String, ConnectionEpoch)> {
        if self.state != ConnectionState::Reconnecting {
            return None;
        }
        let url = self.url.clone()?;
        self.epoch = self.epoch.next();
        self.state = ConnectionState::Connecting;
        Some((url, self.epoch))
    }

    /// Connecting -> Open. Returns whether this completed a reconnect.
    pub fn mark_open(&mut self) -> bool {
        let reconnected = self.backoff.attempts() > 0;
        self.backoff.reset();
        self.state = ConnectionState::Open;
        reconnected
    }

    /// Open (lost) or Connecting (failed reconnect) -> Reconnecting, or
    /// -> Idle once attempts run out.
    pub fn schedule_reconnect(&mut self) -> ReconnectDecision {
        match self.backoff.next_delay_and_advance() {
            Some(delay) => {
                self.state = ConnectionState::Reconnecting;
                ReconnectDecision::Scheduled {
                    attempt: self.backoff.attempts(),
                    delay,
                }
            }
            None => {
                self.mark_idle();
                ReconnectDecision::Exhausted
            }
        }
    }

    /// Explicit close. Open goes through Closing; anything else is already
    /// without a live socket and drops straight to Idle.
    pub fn begin_close(&mut self) -> ConnectionState {
        let previous = self.state;
        self.backoff.reset();
        self.state = match previous {
            ConnectionState::Open | ConnectionState::Closing => ConnectionState::Closing,
            _ => ConnectionState::Idle,
        };
        previous
    }

    pub fn mark_idle(&mut self) {
        self.backoff.reset();
        self.state = ConnectionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> ConnectionLifecycle {
        ConnectionLifecycle::new(Duration::from_secs(2), 5)
    }

    #[test]
    fn test_connection_state_roundtrip() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Reconnecting,
            ConnectionState::Closing,
        ] {
            assert_eq!(ConnectionState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn test_backoff_is_linear_and_bounded() {
        let mut backoff = BackoffState::new(Duration::from_secs(2), 5);
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay_and_advance())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![2, 4, 6, 8, 10]);
        assert!(backoff.is_exhausted());
    }

    #[test]
    fn test_each_open_gets_new_epoch() {
        let mut lc = lifecycle();
        let first = lc.begin_connect("ws://a".into());
        lc.mark_open();
        lc.schedule_reconnect();
        let (url, second) = lc.begin_reconnect_attempt().expect("reconnecting");
        assert_eq!(url, "ws://a");
        assert!(second > first);
        assert!(!lc.is_current(first));
        assert!(lc.is_reconnect_attempt());
    }

    #[test]
    fn test_open_resets_attempts() {
        let mut lc = lifecycle();
        lc.begin_connect("ws://a".into());
        lc.mark_open();
        lc.schedule_reconnect();
        lc.begin_reconnect_attempt();
        assert!(lc.mark_open());
        assert_eq!(lc.reconnect_attempt(), 0);
        assert_eq!(lc.state(), ConnectionState::Open);
    }

    #[test]
    fn test_exhaustion_returns_to_idle() {
        let mut lc = lifecycle();
        lc.begin_connect("ws://a".into());
        lc.mark_open();
        for _ in 0..5 {
            assert!(matches!(
                lc.schedule_reconnect(),
                ReconnectDecision::Scheduled { .. }
            ));
            lc.begin_reconnect_attempt();
        }
        assert_eq!(lc.schedule_reconnect(), ReconnectDecision::Exhausted);
        assert_eq!(lc.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_close_from_open_goes_through_closing() {
        let mut lc = lifecycle();
        lc.begin_connect("ws://a".into());
        lc.mark_open();
        assert_eq!(lc.begin_close(), ConnectionState::Open);
        assert_eq!(lc.state(), ConnectionState::Closing);
    }

    #[test]
    fn test_close_while_reconnecting_goes_idle() {
        let mut lc = lifecycle();
        lc.begin_connect("ws://a".into());
        lc.mark_open();
        lc.schedule_reconnect();
        lc.begin_close();
        assert_eq!(lc.state(), ConnectionState::Idle);
        assert_eq!(lc.reconnect_attempt(), 0);
    }
}
