//! The capability a session speaks through.

use async_trait::async_trait;

use super::errors::TransportError;

/// A bidirectional stream of text frames.
///
/// Implemented by the websocket connection in the server and by the
/// in-process channel pair robots use. The session is identical over both.
#[async_trait]
pub trait Transport: Send {
    /// Sends one encoded frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Waits for the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;
}
