//! Networking layer between sessions and their peers.
//!
//! Frames are JSON arrays of an opcode followed by arguments. The
//! [`transport::Transport`] trait hides whether a frame travels over a
//! websocket or an in-process channel.

/// Error types for frame decoding and transports.
pub mod errors;

/// Opcodes, requests and server messages.
pub mod messages;

/// The send/receive capability a session speaks through.
pub mod transport;

pub use errors::{ProtocolError, TransportError};
pub use messages::{Request, Response, ServerMessage};
pub use transport::Transport;
