//! Network error types for frame decoding and transports.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while decoding a frame
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON array
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The frame has no opcode
    #[error("Empty frame")]
    EmptyFrame,

    /// The opcode is not a non-negative integer
    #[error("Opcode is not a number: {0}")]
    BadOpcode(String),

    /// No request or response uses this opcode
    #[error("Unknown opcode {0}")]
    UnknownOpcode(u64),

    /// The frame is shorter than its opcode requires
    #[error("Missing argument {0}")]
    MissingArgument(usize),

    /// An argument has the wrong shape
    #[error("Invalid argument {index}: {reason}")]
    BadArgument { index: usize, reason: String },

    /// A card id outside `0..=53`
    #[error("Card id {0} is outside the deck")]
    BadCard(u8),
}

/// Errors reported by a [`Transport`](super::transport::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// The other end went away
    #[error("Transport closed")]
    Closed,

    /// A write did not complete in time
    #[error("Write deadline of {0:?} exceeded")]
    WriteTimeout(Duration),

    /// Nothing was read, not even a pong, in time
    #[error("No traffic for {0:?}")]
    ReadTimeout(Duration),

    /// The underlying connection failed
    #[error("Transport failure: {0}")]
    Io(String),
}

/// Result type for frame decoding
pub type Result<T> = std::result::Result<T, ProtocolError>;
