//! Transport Port - raw bidirectional text channel to the server
//!
//! The transport knows nothing about the protocol: it opens a socket, moves
//! text frames, and reports closure. Retry and backoff live above it.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifies one opened transport. Every `open` gets a fresh epoch, and
/// events carrying an older epoch belong to a socket the engine has already
/// given up on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionEpoch(u64);

impl ConnectionEpoch {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Produced by the driver when `open` resolves; adapters never emit it.
    Opened,
    Frame(String),
    Closed {
        code: Option<u16>,
        reason: String,
        was_clean: bool,
    },
    Error(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Transport is not connected")]
    NotConnected,
}

/// Where an open transport delivers its events.
///
/// Bound to the epoch it was created for, so adapters cannot mislabel events.
#[derive(Debug, Clone)]
pub struct TransportSink {
    epoch: ConnectionEpoch,
    tx: mpsc::UnboundedSender<(ConnectionEpoch, TransportEvent)>,
}

impl TransportSink {
    pub fn new(
        epoch: ConnectionEpoch,
        tx: mpsc::UnboundedSender<(ConnectionEpoch, TransportEvent)>,
    ) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    /// Deliver an event. Returns false once the receiving session is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.epoch, event)).is_ok()
    }
}

/// Opens transports.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a channel to `url`. Resolves once the handshake completes.
    async fn open(
        &self,
        url: &str,
        sink: TransportSink,
    ) -> Result<Box<dyn TransportChannel>, TransportError>;
}

/// An open channel.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TransportChannel: Send + Sync {
    /// Queue one text frame for sending.
    fn send(&self, frame: String) -> Result<(), TransportError>;

    /// Close the channel. Idempotent.
    fn close(&self);
}
