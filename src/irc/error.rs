//! Error types for the IRC engine.
//!
//! Each layer has its own error so the connection driver can decide what is
//! fatal: framing and transport errors end the connection (and trigger the
//! reconnect policy), parse errors only drop a line, and registration errors
//! are terminal.

use thiserror::Error;

/// The framer's buffer grew past its limit without seeing a line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("line exceeds maximum length ({limit} bytes, buffered {buffered})")]
    LineTooLong { limit: usize, buffered: usize },
}

/// A single line could not be parsed into a [`Message`](super::message::Message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty message")]
    Empty,
    #[error("malformed prefix: {0:?}")]
    MalformedPrefix(String),
    #[error("prefix present but missing command")]
    MissingCommand,
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),
}

/// Nickname negotiation gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("nickname {desired:?} still in use after {attempts} attempts")]
    NicknameExhausted { desired: String, attempts: u32 },
}

/// Everything that can end a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data from server for {0} seconds")]
    Timeout(u64),
    #[error("timed out connecting to {host}:{port}")]
    ConnectTimeout { host: String, port: u16 },
    #[error("connection closed by server")]
    Closed,
}

impl ConnectionError {
    /// Terminal errors are never retried by the reconnect supervisor.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionError::Registration(_))
    }
}
