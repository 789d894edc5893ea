//! Error taxonomy for session negotiation and transport I/O.
//!
//! Nothing here is retried internally: every failure is surfaced to the
//! caller, who either re-copies a blob, restarts the handshake from
//! scratch, or ignores a degraded frame. No error is fatal to the process.

use crate::core::session::ConnectionState;
use thiserror::Error;

/// Errors produced by the session layer and its transport.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The pasted signaling text is not a valid descriptor blob.
    /// The session stays in its current state; the user must re-copy.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// The transport failed to produce a local descriptor or gather
    /// candidates. The handshake must be restarted.
    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// The remote descriptor was rejected by the transport (wrong type,
    /// applied twice, incompatible with local state).
    #[error("cannot apply remote descriptor: {0}")]
    Apply(String),

    /// The established connection dropped or a send failed. Not retried
    /// automatically; recovery is a fresh session.
    #[error("transport failure: {0}")]
    Transport(String),

    /// An operation was called in a state that does not permit it.
    #[error("{op} is not valid in state {state:?}")]
    InvalidTransition {
        op: &'static str,
        state: ConnectionState,
    },

    /// Outbound envelope serialization failed. Inbound text that fails to
    /// parse is not an error — it degrades to a literal chat message.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
