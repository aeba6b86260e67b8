//! Error taxonomy shared by the tracker and the node agent.

use std::time::Duration;

/// Malformed tag or payload on the wire.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,
    #[error("unknown tag '{0}'")]
    UnknownTag(String),
    #[error("missing payload for '{0}'")]
    MissingPayload(&'static str),
    #[error("{tag}: {source}")]
    InvalidPayload {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("line is not valid UTF-8")]
    NotUtf8,
}

/// Chat / file request that does not match a known session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("request carries no sender or token")]
    MissingCredentials,
    #[error("no session for sender {0}")]
    UnknownSender(String),
    #[error("token mismatch for sender {0}")]
    TokenMismatch(String),
}

/// Failure of a single outbound request/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {addr} timed out after {after:?}")]
    Timeout { addr: String, after: Duration },
    #[error("i/o with {addr} failed: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{addr} closed the connection without a response")]
    Closed { addr: String },
    #[error("line from {addr} exceeds {limit} bytes")]
    LineTooLong { addr: String, limit: usize },
}

/// Operation referencing a peer we hold no session for.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Peer {0} not connected")]
    UnknownPeer(String),
}

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("peer rejected handshake: {0}")]
    Rejected(String),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// A command line from the control channel that cannot be executed.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Error in {command}: {reason}")]
    Invalid {
        command: &'static str,
        reason: String,
    },
}
