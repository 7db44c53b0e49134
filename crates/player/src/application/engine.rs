//! The session protocol engine.
//!
//! Sans-IO: the engine owns all session state and reacts to three kinds of
//! input (caller intents, transport events, timer fires). It never touches a
//! socket or a clock-driven timer itself; instead it queues [`Effect`]s that
//! the driver executes. Everything here is synchronous and single-threaded,
//! which keeps every transition testable without a runtime.

use std::sync::Arc;
use std::time::Duration;

use hearthlink_domain::{AccountStats, PlayerSnapshot};
use hearthlink_shared::{
    obfuscate_chat, AuthKind, AuthResponse, ChatRequest, ClientMessage, GameAction, GameRequest,
    GameResponse,
};

use super::combat::{CombatPhase, CombatSession};
use super::commands::{ChatInput, ChatOutcome, LocalCommand};
use super::correlator::{OperationId, OperationKind, PendingOperation, PendingRequest, RequestCorrelator};
use super::dedup::DedupWindow;
use super::dispatcher::{DisplayPreferences, MessageDispatcher, Routed};
use super::effects::{
    Effect, OperationOutcome, SessionEvent, SessionView, Ticket, TimerKey, TimerTable,
};
use super::error::SessionError;
use super::lifecycle::{ConnectionLifecycle, ConnectionState, ReconnectDecision};
use crate::config::ClientConfig;
use crate::ports::outbound::{ClockPort, ConnectionEpoch, TransportError, TransportEvent};

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Sent with every game request.
    pub token: String,
    pub stats: AccountStats,
}

pub struct SessionEngine {
    connect_timeout: Duration,
    request_timeout: Duration,
    clock: Arc<dyn ClockPort>,
    lifecycle: ConnectionLifecycle,
    dispatcher: MessageDispatcher,
    correlator: RequestCorrelator,
    combat: CombatSession,
    timers: TimerTable,
    session: Option<Session>,
    player: Option<PlayerSnapshot>,
    connect_waiter: Option<OperationId>,
    published_state: ConnectionState,
    effects: Vec<Effect>,
}

impl SessionEngine {
    pub fn new(config: &ClientConfig, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            clock,
            lifecycle: ConnectionLifecycle::new(
                config.reconnect_base_delay,
                config.max_reconnect_attempts,
            ),
            dispatcher: MessageDispatcher::new(
                DedupWindow::new(config.dedup_high_water, config.dedup_retain),
                DisplayPreferences {
                    hide_others: config.hide_others,
                    debug_overlay: false,
                },
            ),
            correlator: RequestCorrelator::default(),
            combat: CombatSession::default(),
            timers: TimerTable::default(),
            session: None,
            player: None,
            connect_waiter: None,
            published_state: ConnectionState::Idle,
            effects: Vec::new(),
        }
    }

    /// Drain everything queued since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True if an `open` for `epoch` is still wanted.
    pub fn is_awaiting_open(&self, epoch: ConnectionEpoch) -> bool {
        self.lifecycle.state() == ConnectionState::Connecting && self.lifecycle.is_current(epoch)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.lifecycle.state(),
            url: self.lifecycle.url().map(str::to_string),
            username: self.session.as_ref().map(|s| s.username.clone()),
            stats: self.session.as_ref().map(|s| s.stats.clone()),
            player: self.player.clone(),
            enemy: self.combat.enemy().cloned(),
            preferences: self.dispatcher.preferences(),
            reconnect_attempt: self.lifecycle.reconnect_attempt(),
            auth_pending: self.correlator.is_pending(OperationKind::Auth),
            combat_pending: self.correlator.is_pending(OperationKind::CombatAction),
        }
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Open a connection to an already-normalized websocket URL.
    pub fn connect(&mut self, url: String) -> Result<Ticket, SessionError> {
        match self.lifecycle.state() {
            ConnectionState::Open if self.lifecycle.url() == Some(url.as_str()) => {
                return Ok(Ticket::Done(OperationOutcome::Connected));
            }
            ConnectionState::Idle => {}
            _ => return Err(SessionError::OperationInProgress),
        }

        let epoch = self.lifecycle.begin_connect(url.clone());
        tracing::info!(url = %url, epoch = %epoch, "Connecting to server");
        self.start_open(url, epoch);

        let id = OperationId::new();
        self.connect_waiter = Some(id);
        Ok(Ticket::Pending(id))
    }

    /// Send a login or register request on the open connection.
    pub fn authenticate(
        &mut self,
        kind: AuthKind,
        username: String,
        password: String,
    ) -> Result<Ticket, SessionError> {
        self.require_open()?;
        if self.session.is_some() {
            return Err(SessionError::invalid_state("Already logged in"));
        }

        let request = match kind {
            AuthKind::Register => ChatRequest::Register {
                user: username.clone(),
                pw: password,
            },
            AuthKind::Login => ChatRequest::Login {
                user: username.clone(),
                pw: password,
            },
        };
        let frame = encode(&request.into())?;
        let id = self
            .correlator
            .issue(PendingRequest::Auth { kind, username }, self.clock.now())?;

        self.push(Effect::SendFrame {
            frame,
            op: Some(id),
        });
        self.arm(TimerKey::Operation(OperationKind::Auth), self.request_timeout);
        Ok(Ticket::Pending(id))
    }

    /// Chat input. Local toggles never leave the client.
    pub fn send_chat(&mut self, raw: &str) -> Result<Ticket, SessionError> {
        match ChatInput::parse(raw) {
            ChatInput::Empty => Ok(Ticket::Done(OperationOutcome::Chat(ChatOutcome::Ignored))),
            ChatInput::Local(command) => {
                let enabled = self.dispatcher.toggle(command);
                let label = match command {
                    LocalCommand::HideOthers => "Hide other players' server messages",
                    LocalCommand::Debug => "Debug overlay",
                };
                let state = if enabled { "on" } else { "off" };
                self.notify(SessionEvent::Notice(format!("{}: {}", label, state)));
                Ok(Ticket::Done(OperationOutcome::Chat(ChatOutcome::Toggled {
                    command,
                    enabled,
                })))
            }
            ChatInput::Outbound(text) => {
                self.require_open()?;
                let frame = encode(
                    &ChatRequest::Send {
                        msg: obfuscate_chat(&text),
                    }
                    .into(),
                )?;
                self.push(Effect::SendFrame { frame, op: None });
                Ok(Ticket::Done(OperationOutcome::Chat(ChatOutcome::Sent)))
            }
        }
    }

    /// Ask the server to replay recent broadcasts.
    pub fn poll(&mut self) -> Result<Ticket, SessionError> {
        self.require_open()?;
        self.send_poll()?;
        Ok(Ticket::Done(OperationOutcome::PollRequested))
    }

    /// Issue a game request after the local legality checks.
    pub fn game_action(&mut self, action: GameAction) -> Result<Ticket, SessionError> {
        self.require_open()?;
        let token = self
            .session
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or(SessionError::NotAuthenticated)?;
        if self.correlator.is_pending(OperationKind::CombatAction) {
            return Err(SessionError::OperationInProgress);
        }
        self.combat.preflight(&action, self.player.as_ref())?;

        let frame = encode(&GameRequest::new(action.clone(), token).into())?;
        let id = self
            .correlator
            .issue(PendingRequest::Game(action.clone()), self.clock.now())?;
        self.combat.begin(&action);

        tracing::debug!(op = %id, action = action.label(), "Game request issued");
        self.push(Effect::SendFrame {
            frame,
            op: Some(id),
        });
        self.arm(
            TimerKey::Operation(OperationKind::CombatAction),
            self.request_timeout,
        );
        Ok(Ticket::Pending(id))
    }

    /// End the session and close the connection.
    pub fn logout(&mut self) -> Ticket {
        if let Some(session) = &self.session {
            tracing::info!(user = %session.username, "Logging out");
        }
        self.teardown(SessionError::Cancelled);
        self.notify(SessionEvent::LoggedOut);
        Ticket::Done(OperationOutcome::LoggedOut)
    }

    // =========================================================================
    // Inputs from the driver
    // =========================================================================

    pub fn on_transport_event(&mut self, epoch: ConnectionEpoch, event: TransportEvent) {
        if !self.lifecycle.is_current(epoch) {
            tracing::trace!(epoch = %epoch, current = %self.lifecycle.epoch(), "Stale transport event ignored");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(),
            TransportEvent::Frame(text) => self.on_frame(&text),
            TransportEvent::Error(detail) => self.on_transport_error(detail),
            TransportEvent::Closed {
                code,
                reason,
                was_clean,
            } => self.on_closed(code, reason, was_clean),
        }
        self.publish_state();
    }

    pub fn on_timer(&mut self, key: TimerKey, seq: u64) {
        if !self.timers.fire(key, seq) {
            tracing::trace!(?key, seq, "Stale timer ignored");
            return;
        }

        match key {
            TimerKey::ConnectDeadline => {
                if self.lifecycle.state() == ConnectionState::Connecting {
                    tracing::warn!(url = ?self.lifecycle.url(), "Connection attempt timed out");
                    self.connect_failed(SessionError::ConnectionTimeout);
                }
            }
            TimerKey::Reconnect => {
                if let Some((url, epoch)) = self.lifecycle.begin_reconnect_attempt() {
                    tracing::info!(
                        attempt = self.lifecycle.reconnect_attempt(),
                        url = %url,
                        "Attempting reconnect"
                    );
                    self.start_open(url, epoch);
                }
            }
            TimerKey::Operation(kind) => self.operation_timed_out(kind),
        }
        self.publish_state();
    }

    /// A frame queued by `SendFrame` could not be written.
    pub fn on_send_failed(&mut self, op: Option<OperationId>, error: TransportError) {
        tracing::warn!(error = %error, op = ?op, "Failed to send frame");
        let Some(id) = op else {
            self.notify(SessionEvent::Notice(format!(
                "Message was not delivered: {}",
                error
            )));
            return;
        };
        for kind in [OperationKind::Auth, OperationKind::CombatAction] {
            if let Some(pending) = self.correlator.take_if(kind, id) {
                self.cancel_timer(TimerKey::Operation(kind));
                self.fail_operation(pending, SessionError::from(error.clone()));
            }
        }
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    fn start_open(&mut self, url: String, epoch: ConnectionEpoch) {
        self.push(Effect::OpenTransport { url, epoch });
        self.arm(TimerKey::ConnectDeadline, self.connect_timeout);
        self.publish_state();
    }

    fn on_opened(&mut self) {
        if self.lifecycle.state() != ConnectionState::Connecting {
            return;
        }
        self.cancel_timer(TimerKey::ConnectDeadline);
        let reconnected = self.lifecycle.mark_open();
        tracing::info!(url = ?self.lifecycle.url(), reconnected, "Connected to server");

        if let Some(id) = self.connect_waiter.take() {
            self.complete(id, Ok(OperationOutcome::Connected));
        }
        self.notify(SessionEvent::Connected { reconnected });

        if reconnected && self.session.is_some() {
            // Catch up on broadcasts missed while offline.
            if let Err(e) = self.send_poll() {
                tracing::warn!(error = %e, "Could not request catch-up poll");
            }
        }
    }

    fn on_transport_error(&mut self, detail: String) {
        tracing::warn!(error = %detail, state = ?self.lifecycle.state(), "Transport error");
        if self.lifecycle.state() == ConnectionState::Connecting {
            self.connect_failed(SessionError::ConnectionFailed(detail));
        }
    }

    fn on_closed(&mut self, code: Option<u16>, reason: String, was_clean: bool) {
        tracing::debug!(?code, reason = %reason, was_clean, state = ?self.lifecycle.state(), "Transport closed");
        match self.lifecycle.state() {
            ConnectionState::Closing => {
                self.lifecycle.mark_idle();
                self.notify(SessionEvent::Disconnected);
            }
            ConnectionState::Connecting => {
                let detail = if reason.is_empty() {
                    "closed before open".to_string()
                } else {
                    reason
                };
                self.connect_failed(SessionError::ConnectionFailed(detail));
            }
            ConnectionState::Open => self.connection_lost(),
            ConnectionState::Idle | ConnectionState::Reconnecting => {}
        }
    }

    fn connect_failed(&mut self, error: SessionError) {
        self.cancel_timer(TimerKey::ConnectDeadline);
        self.push(Effect::CloseTransport {
            epoch: self.lifecycle.epoch(),
        });

        if self.lifecycle.is_reconnect_attempt() {
            tracing::warn!(
                attempt = self.lifecycle.reconnect_attempt(),
                error = %error,
                "Reconnect attempt failed"
            );
            self.schedule_reconnect();
            return;
        }

        tracing::error!(error = %error, "Failed to connect");
        self.lifecycle.mark_idle();
        if let Some(id) = self.connect_waiter.take() {
            self.complete(id, Err(error.clone()));
        }
        self.notify(SessionEvent::ConnectFailed(error));
    }

    fn connection_lost(&mut self) {
        tracing::warn!(url = ?self.lifecycle.url(), "Connection closed unexpectedly");
        self.reject_pending(SessionError::ConnectionLost);
        self.notify(SessionEvent::ConnectionLost);

        if self.session.is_some() {
            self.schedule_reconnect();
        } else {
            self.lifecycle.mark_idle();
            self.notify(SessionEvent::Disconnected);
        }
    }

    fn schedule_reconnect(&mut self) {
        match self.lifecycle.schedule_reconnect() {
            ReconnectDecision::Scheduled { attempt, delay } => {
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                self.arm(TimerKey::Reconnect, delay);
                self.notify(SessionEvent::ReconnectScheduled { attempt, delay });
            }
            ReconnectDecision::Exhausted => {
                tracing::error!("Max reconnection attempts reached, giving up");
                for key in self.timers.clear() {
                    self.push(Effect::CancelTimer { key });
                }
                self.reject_pending(SessionError::ReconnectExhausted);
                self.clear_session();
                self.notify(SessionEvent::ReconnectExhausted);
            }
        }
    }

    /// Cancel everything and close whatever socket exists.
    fn teardown(&mut self, reason: SessionError) {
        for key in self.timers.clear() {
            self.push(Effect::CancelTimer { key });
        }
        self.reject_pending(reason.clone());
        if let Some(id) = self.connect_waiter.take() {
            self.complete(id, Err(reason));
        }
        self.clear_session();

        let epoch = self.lifecycle.epoch();
        match self.lifecycle.begin_close() {
            ConnectionState::Open | ConnectionState::Connecting => {
                self.push(Effect::CloseTransport { epoch });
            }
            _ => {}
        }
        self.publish_state();
    }

    fn clear_session(&mut self) {
        self.session = None;
        self.player = None;
        self.combat.reset();
        self.dispatcher.clear_history();
    }

    // =========================================================================
    // Inbound routing
    // =========================================================================

    fn on_frame(&mut self, text: &str) {
        if self.lifecycle.state() != ConnectionState::Open {
            tracing::debug!("Frame received while not open; dropped");
            return;
        }

        let user = self.session.as_ref().map(|s| s.username.clone());
        for routed in self.dispatcher.dispatch(text, user.as_deref()) {
            match routed {
                Routed::Auth(response) => self.on_auth_response(response),
                Routed::Game(response) => self.on_game_response(response),
                Routed::ServerError(message) => self.on_server_error(message),
                Routed::Chat(line) => self.notify(SessionEvent::Chat(line)),
                Routed::Diagnostic(line) => self.notify(SessionEvent::Diagnostic(line)),
            }
        }
    }

    fn on_auth_response(&mut self, response: AuthResponse) {
        let Some(op) = self.correlator.take(OperationKind::Auth) else {
            tracing::warn!(kind = ?response.kind, "Auth response with no pending request; dropped");
            return;
        };
        self.cancel_timer(TimerKey::Operation(OperationKind::Auth));
        self.log_completion(&op);

        let PendingRequest::Auth { username, .. } = op.request else {
            return;
        };

        if !response.ok {
            let message = response.msg.unwrap_or_else(|| match response.kind {
                AuthKind::Register => "Registration failed".to_string(),
                AuthKind::Login => "Login failed".to_string(),
            });
            tracing::warn!(user = %username, reason = %message, "Authentication rejected");
            self.complete(op.id, Err(SessionError::Rejected(message)));
            self.teardown(SessionError::Cancelled);
            return;
        }

        match response.kind {
            AuthKind::Register => {
                tracing::info!(user = %username, "Registered");
                self.complete(
                    op.id,
                    Ok(OperationOutcome::Registered {
                        message: response.msg,
                    }),
                );
            }
            AuthKind::Login => {
                let token = response.token.unwrap_or_else(|| username.clone());
                let stats = response.stats.unwrap_or_default();
                tracing::info!(user = %username, level = stats.level, "Logged in");
                self.session = Some(Session {
                    username: username.clone(),
                    token,
                    stats: stats.clone(),
                });
                self.complete(
                    op.id,
                    Ok(OperationOutcome::LoggedIn {
                        username: username.clone(),
                        stats,
                    }),
                );
                self.notify(SessionEvent::Authenticated { username });
                if let Err(e) = self.send_poll() {
                    tracing::warn!(error = %e, "Could not request initial poll");
                }
                self.load_player();
            }
        }
    }

    /// Fetch the authoritative player snapshot. Nobody awaits the result;
    /// it lands in `self.player` and is announced as `PlayerUpdated`.
    fn load_player(&mut self) {
        if let Err(e) = self.game_action(GameAction::Player) {
            tracing::warn!(error = %e, "Could not request player snapshot");
        }
    }

    fn on_game_response(&mut self, response: GameResponse) {
        let Some(op) = self.correlator.take(OperationKind::CombatAction) else {
            tracing::warn!("Game response with no pending request; dropped");
            return;
        };
        self.cancel_timer(TimerKey::Operation(OperationKind::CombatAction));
        self.log_completion(&op);

        let PendingRequest::Game(action) = &op.request else {
            return;
        };

        let before = self.player.clone();
        let was_engaged = self.combat.phase() == CombatPhase::Engaged;
        let result = self.combat.fold(action, response, &mut self.player);

        if self.player != before {
            if let Some(player) = self.player.clone() {
                self.notify(SessionEvent::PlayerUpdated(player));
            }
        }
        if was_engaged && self.combat.phase() == CombatPhase::Idle {
            tracing::info!("Battle ended");
        }

        self.complete(op.id, result.map(OperationOutcome::Combat));
    }

    fn on_server_error(&mut self, message: String) {
        match self.correlator.take(OperationKind::CombatAction) {
            Some(op) => {
                self.cancel_timer(TimerKey::Operation(OperationKind::CombatAction));
                self.fail_operation(op, SessionError::Rejected(message));
            }
            None => self.notify(SessionEvent::Notice(message)),
        }
    }

    // =========================================================================
    // Operation bookkeeping
    // =========================================================================

    fn operation_timed_out(&mut self, kind: OperationKind) {
        let Some(op) = self.correlator.take(kind) else {
            return;
        };
        tracing::warn!(op = %op.id, kind = %kind, elapsed_ms = self.elapsed_ms(&op), "Request timed out");
        self.fail_operation(op, SessionError::Timeout);

        if kind == OperationKind::Auth {
            self.teardown(SessionError::Cancelled);
        }
    }

    /// Reject every outstanding request with `reason`.
    fn reject_pending(&mut self, reason: SessionError) {
        for op in self.correlator.drain() {
            self.cancel_timer(TimerKey::Operation(op.kind()));
            self.fail_operation(op, reason.clone());
        }
    }

    /// Flee never fails from the caller's point of view: the battle is
    /// already over locally.
    fn fail_operation(&mut self, op: PendingOperation, error: SessionError) {
        let result = match op.request {
            PendingRequest::Game(GameAction::Flee) => Ok(OperationOutcome::Combat(
                CombatSession::flee_unconfirmed(),
            )),
            _ => Err(error),
        };
        self.complete(op.id, result);
    }

    fn log_completion(&self, op: &PendingOperation) {
        tracing::debug!(op = %op.id, kind = %op.kind(), elapsed_ms = self.elapsed_ms(op), "Response matched");
    }

    fn elapsed_ms(&self, op: &PendingOperation) -> i64 {
        (self.clock.now() - op.issued_at).num_milliseconds()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require_open(&self) -> Result<(), SessionError> {
        if self.lifecycle.state() == ConnectionState::Open {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn send_poll(&mut self) -> Result<(), SessionError> {
        let frame = encode(&ChatRequest::Poll.into())?;
        self.push(Effect::SendFrame { frame, op: None });
        Ok(())
    }

    fn arm(&mut self, key: TimerKey, after: Duration) {
        let seq = self.timers.arm(key);
        self.push(Effect::ArmTimer { key, seq, after });
    }

    fn cancel_timer(&mut self, key: TimerKey) {
        if self.timers.cancel(key) {
            self.push(Effect::CancelTimer { key });
        }
    }

    fn complete(&mut self, op: OperationId, result: Result<OperationOutcome, SessionError>) {
        self.push(Effect::Complete { op, result });
    }

    fn notify(&mut self, event: SessionEvent) {
        self.push(Effect::Notify(event));
    }

    fn publish_state(&mut self) {
        let state = self.lifecycle.state();
        if state != self.published_state {
            self.published_state = state;
            self.notify(SessionEvent::StateChanged(state));
        }
    }

    fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }
}

fn encode(message: &ClientMessage) -> Result<String, SessionError> {
    message
        .to_frame()
        .map_err(|e| SessionError::ProtocolError(e.to_string()))
}
