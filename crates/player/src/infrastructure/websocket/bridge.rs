//! Session Bridge - connects the CommandBus/EventBus to the session engine.
//!
//! `create_session` sets up:
//! - A CommandBus for submitting intents
//! - An EventBus for session events
//! - A background driver task that owns the [`SessionEngine`], the current
//!   transport channel and the timer tasks, and executes the engine's effects

use std::collections::HashMap;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::session_client::SessionClient;
use crate::application::effects::{Effect, Ticket, TimerKey};
use crate::application::{ConnectionState, SessionEngine};
use crate::config::ClientConfig;
use crate::infrastructure::messaging::{
    set_connection_state, BusMessage, CommandBus, ConnectionStateObserver, EventBus, Intent,
    OperationResult, PendingRequests,
};
use crate::ports::outbound::{
    ClockPort, ConnectionEpoch, TransportChannel, TransportConnector, TransportError,
    TransportEvent, TransportSink,
};

/// Everything a caller needs to drive and observe one session.
pub struct SessionParts {
    pub client: SessionClient,
    pub events: EventBus,
    pub state: ConnectionStateObserver,
}

/// Spawn the driver task. Must be called inside a tokio runtime.
///
/// The driver runs until every [`SessionClient`] clone has been dropped.
pub fn create_session(
    config: ClientConfig,
    connector: Arc<dyn TransportConnector>,
    clock: Arc<dyn ClockPort>,
) -> SessionParts {
    let (cmd_tx, cmd_rx) = mpsc::channel::<BusMessage>(32);
    let state = Arc::new(AtomicU8::new(ConnectionState::Idle.to_u8()));

    let events = EventBus::new();
    let engine = SessionEngine::new(&config, clock);
    let driver = Driver::new(engine, connector, events.clone(), Arc::clone(&state));
    tokio::spawn(driver.run(cmd_rx));

    SessionParts {
        client: SessionClient::new(CommandBus::new(cmd_tx)),
        events,
        state: ConnectionStateObserver::new(state),
    }
}

enum Internal {
    Opened {
        epoch: ConnectionEpoch,
        result: Result<Box<dyn TransportChannel>, TransportError>,
    },
    TimerFired {
        key: TimerKey,
        seq: u64,
    },
}

struct Driver {
    engine: SessionEngine,
    connector: Arc<dyn TransportConnector>,
    events: EventBus,
    state: Arc<AtomicU8>,
    pending: PendingRequests,
    channel: Option<(ConnectionEpoch, Box<dyn TransportChannel>)>,
    opening: Option<(ConnectionEpoch, JoinHandle<()>)>,
    timers: HashMap<TimerKey, (u64, JoinHandle<()>)>,
    transport_tx: mpsc::UnboundedSender<(ConnectionEpoch, TransportEvent)>,
    transport_rx: mpsc::UnboundedReceiver<(ConnectionEpoch, TransportEvent)>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
}

impl Driver {
    fn new(
        engine: SessionEngine,
        connector: Arc<dyn TransportConnector>,
        events: EventBus,
        state: Arc<AtomicU8>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            connector,
            events,
            state,
            pending: PendingRequests::default(),
            channel: None,
            opening: None,
            timers: HashMap::new(),
            transport_tx,
            transport_rx,
            internal_tx,
            internal_rx,
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<BusMessage>) {
        loop {
            let mut ready = None;

            // Opens and timer fires first: a freshly opened channel must be
            // installed before frames that arrived on it are routed.
            tokio::select! {
                biased;

                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),

                Some((epoch, event)) = self.transport_rx.recv() => {
                    self.engine.on_transport_event(epoch, event);
                }

                cmd = cmd_rx.recv() => match cmd {
                    Some(message) => ready = self.handle_command(message),
                    None => {
                        tracing::debug!("All session clients dropped, shutting down driver");
                        self.engine.logout();
                        self.execute().await;
                        break;
                    }
                },
            }

            self.execute().await;

            if let Some((reply, result)) = ready {
                // The caller may have given up; nothing to do then.
                let _ = reply.send(result);
            }
        }

        self.shutdown();
    }

    /// Returns a reply to send once this step's effects have run.
    fn handle_command(
        &mut self,
        message: BusMessage,
    ) -> Option<(oneshot::Sender<OperationResult>, OperationResult)> {
        let (intent, reply) = match message {
            BusMessage::Snapshot(reply) => {
                let _ = reply.send(self.engine.view());
                return None;
            }
            BusMessage::Intent { intent, reply } => (intent, reply),
        };

        tracing::debug!(intent = intent.label(), "Intent received");
        let ticket = match intent {
            Intent::Connect(url) => self.engine.connect(url),
            Intent::Authenticate {
                kind,
                username,
                password,
            } => self.engine.authenticate(kind, username, password),
            Intent::Chat(text) => self.engine.send_chat(&text),
            Intent::Poll => self.engine.poll(),
            Intent::Game(action) => self.engine.game_action(action),
            Intent::Logout => Ok(self.engine.logout()),
        };

        match ticket {
            Ok(Ticket::Pending(id)) => {
                self.pending.insert(id, reply);
                None
            }
            Ok(Ticket::Done(outcome)) => Some((reply, Ok(outcome))),
            Err(e) => {
                tracing::debug!(error = %e, "Intent refused");
                Some((reply, Err(e)))
            }
        }
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::TimerFired { key, seq } => {
                if self.timers.get(&key).is_some_and(|(armed, _)| *armed == seq) {
                    self.timers.remove(&key);
                }
                self.engine.on_timer(key, seq);
            }
            Internal::Opened { epoch, result } => {
                if self.opening.as_ref().is_some_and(|(e, _)| *e == epoch) {
                    self.opening = None;
                }
                match result {
                    Ok(channel) if self.engine.is_awaiting_open(epoch) => {
                        self.channel = Some((epoch, channel));
                        self.engine.on_transport_event(epoch, TransportEvent::Opened);
                    }
                    Ok(channel) => {
                        tracing::debug!(epoch = %epoch, "Late open for an abandoned attempt, closing");
                        channel.close();
                    }
                    Err(e) => {
                        self.engine
                            .on_transport_event(epoch, TransportEvent::Error(e.to_string()));
                    }
                }
            }
        }
    }

    /// Run effects until the engine has nothing more to say.
    async fn execute(&mut self) {
        loop {
            let effects = self.engine.take_effects();
            if effects.is_empty() {
                break;
            }
            // Publish before completions so a resolved caller sees the new state.
            set_connection_state(&self.state, self.engine.connection_state());
            for effect in effects {
                self.apply(effect).await;
            }
        }
        set_connection_state(&self.state, self.engine.connection_state());
    }

    async fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenTransport { url, epoch } => self.open(url, epoch),
            Effect::SendFrame { frame, op } => {
                let result = match &self.channel {
                    Some((_, channel)) => channel.send(frame),
                    None => Err(TransportError::NotConnected),
                };
                if let Err(e) = result {
                    self.engine.on_send_failed(op, e);
                }
            }
            Effect::CloseTransport { epoch } => self.close(epoch),
            Effect::ArmTimer { key, seq, after } => {
                let tx = self.internal_tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Internal::TimerFired { key, seq });
                });
                if let Some((_, old)) = self.timers.insert(key, (seq, handle)) {
                    old.abort();
                }
            }
            Effect::CancelTimer { key } => {
                if let Some((_, handle)) = self.timers.remove(&key) {
                    handle.abort();
                }
            }
            Effect::Complete { op, result } => {
                self.pending.resolve(op, result);
            }
            Effect::Notify(event) => self.events.dispatch(event).await,
        }
    }

    fn open(&mut self, url: String, epoch: ConnectionEpoch) {
        if let Some((stale, handle)) = self.opening.take() {
            tracing::debug!(epoch = %stale, "Abandoning unfinished open");
            handle.abort();
        }

        let connector = Arc::clone(&self.connector);
        let sink = TransportSink::new(epoch, self.transport_tx.clone());
        let internal_tx = self.internal_tx.clone();
        let handle = tokio::spawn(async move {
            let result = connector.open(&url, sink).await;
            let _ = internal_tx.send(Internal::Opened { epoch, result });
        });
        self.opening = Some((epoch, handle));
    }

    fn close(&mut self, epoch: ConnectionEpoch) {
        if self.opening.as_ref().is_some_and(|(e, _)| *e == epoch) {
            if let Some((_, handle)) = self.opening.take() {
                handle.abort();
            }
        }
        if self.channel.as_ref().is_some_and(|(e, _)| *e == epoch) {
            if let Some((_, channel)) = self.channel.take() {
                channel.close();
            }
        }
        // The adapter's own close report may never come once its reader is
        // stopped; report it here so the engine can finish the transition.
        let _ = self.transport_tx.send((
            epoch,
            TransportEvent::Closed {
                code: None,
                reason: "closed by client".to_string(),
                was_clean: true,
            },
        ));
    }

    fn shutdown(&mut self) {
        for (_, (_, handle)) in self.timers.drain() {
            handle.abort();
        }
        if let Some((_, handle)) = self.opening.take() {
            handle.abort();
        }
        if let Some((_, channel)) = self.channel.take() {
            channel.close();
        }
        let dropped = self.pending.clear();
        if dropped > 0 {
            tracing::debug!(count = dropped, "Cleared pending requests on shutdown");
        }
    }
}
