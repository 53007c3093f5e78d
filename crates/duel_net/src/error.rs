//! Error types for the network layer.

use duel_core::error::DuelError;
use duel_core::protocol::{GateViolation, MessageKind};
use thiserror::Error;

/// Result type alias using [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session errors. All of them end the session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A message arrived out of order.
    #[error("Protocol violation: expected {expected}, received {received}")]
    ProtocolViolation {
        /// Kind the session was waiting for.
        expected: MessageKind,
        /// Kind that arrived.
        received: MessageKind,
    },

    /// A frame could not be decoded.
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// A message could not be encoded.
    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// Transport failure.
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer sent Disconnect or closed the stream mid-session.
    #[error("Peer disconnected")]
    PeerDisconnected,

    /// The peer announced an action that does not resolve.
    #[error("Peer action rejected: {0}")]
    InvalidAction(#[from] DuelError),
}

impl From<GateViolation> for SessionError {
    fn from(violation: GateViolation) -> Self {
        Self::ProtocolViolation {
            expected: violation.expected,
            received: violation.received,
        }
    }
}

/// Config loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}
