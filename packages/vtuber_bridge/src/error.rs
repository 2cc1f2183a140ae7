//! Error types for the bridge runtime.

use vtuber_protocol::ProtocolError;

/// Failure handing a frame to a connection's transport task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transport task has exited; nothing more can be sent.
    #[error("connection is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The bridge actor has shut down and no longer accepts commands.
    #[error("bridge has shut down")]
    Gone,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
