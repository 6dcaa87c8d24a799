//! In-process stand-in for a robot's socket.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::net::{Transport, TransportError};

/// Frames buffered in each direction.
pub const ROBOT_CHANNEL_CAPACITY: usize = 64;

/// The session's end of a robot connection.
#[derive(Debug)]
pub struct RobotTransport {
    requests: mpsc::Receiver<String>,
    events: mpsc::Sender<String>,
}

/// The driver's end of a robot connection.
#[derive(Debug)]
pub struct RobotLink {
    /// Request frames for the session.
    pub requests: mpsc::Sender<String>,
    /// Frames the session writes back.
    pub events: mpsc::Receiver<String>,
}

impl RobotTransport {
    /// Creates both ends of a connection.
    pub fn pair() -> (RobotTransport, RobotLink) {
        let (requests_tx, requests) = mpsc::channel(ROBOT_CHANNEL_CAPACITY);
        let (events, events_rx) = mpsc::channel(ROBOT_CHANNEL_CAPACITY);
        (
            RobotTransport { requests, events },
            RobotLink {
                requests: requests_tx,
                events: events_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for RobotTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.events
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        Ok(self.requests.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_cross_both_ways() {
        let (mut transport, mut link) = RobotTransport::pair();
        link.requests.send("[11]".to_string()).await.unwrap();
        assert_eq!(transport.recv().await.unwrap().as_deref(), Some("[11]"));

        transport.send("[12,-1,\"robot1\"]".to_string()).await.unwrap();
        assert_eq!(link.events.recv().await.as_deref(), Some("[12,-1,\"robot1\"]"));
    }

    #[tokio::test]
    async fn test_dropped_link_closes_transport() {
        let (mut transport, link) = RobotTransport::pair();
        drop(link);
        assert_eq!(transport.recv().await.unwrap(), None);
        assert!(matches!(
            transport.send("[43,1]".to_string()).await,
            Err(TransportError::Closed)
        ));
    }
}
