//! Session error taxonomy.
//!
//! Every failure the session surfaces to a caller is one of these. Transport
//! and decode errors are converted at their layer and never leak through as
//! strings.

use thiserror::Error;

use hearthlink_shared::ProtocolError;

use crate::application::endpoint::EndpointError;
use crate::ports::outbound::TransportError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The transport could not be constructed or the handshake failed.
    #[error("Could not connect: {0}")]
    ConnectError(String),

    #[error("Connection attempt timed out")]
    ConnectionTimeout,

    /// The transport closed or errored before it finished opening.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A request of the same kind is already in flight, or a connection
    /// attempt is underway.
    #[error("Another operation is already in progress")]
    OperationInProgress,

    #[error("Request timed out")]
    Timeout,

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Reconnection attempts exhausted")]
    ReconnectExhausted,

    #[error("{0}")]
    InvalidState(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Not logged in")]
    NotAuthenticated,

    /// The server answered but refused; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid server address: {0}")]
    InvalidEndpoint(String),
}

impl SessionError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState(reason.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Message suitable for a status line. Connection failures are collapsed
    /// into one generic line; everything else keeps its own wording.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::ConnectError(_)
            | SessionError::ConnectionTimeout
            | SessionError::ConnectionFailed(_)
            | SessionError::ConnectionLost
            | SessionError::NotConnected => "Cannot reach the server".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { .. } => SessionError::ConnectError(err.to_string()),
            TransportError::NotConnected => SessionError::NotConnected,
        }
    }
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        SessionError::ProtocolError(err.to_string())
    }
}

impl From<EndpointError> for SessionError {
    fn from(err: EndpointError) -> Self {
        SessionError::InvalidEndpoint(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_is_verbatim() {
        assert_eq!(
            SessionError::rejected("Wrong password").to_string(),
            "Wrong password"
        );
    }

    #[test]
    fn test_connection_failures_share_user_message() {
        assert_eq!(
            SessionError::ConnectionTimeout.user_message(),
            SessionError::ConnectionLost.user_message()
        );
        assert_eq!(
            SessionError::invalid_state("Not in battle").user_message(),
            "Not in battle"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: SessionError = TransportError::NotConnected.into();
        assert_eq!(err, SessionError::NotConnected);
    }
}
