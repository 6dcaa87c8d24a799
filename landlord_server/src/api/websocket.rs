//! WebSocket endpoint hosting one player session per connection.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?userid=<id>&username=<name>`
//! 2. Server upgrades and wraps the socket in a [`WsTransport`]
//! 3. A [`Session`] runs over the transport until either side closes
//! 4. The session's teardown leaves any seated table
//!
//! Identity is taken from the query string as-is; account storage and
//! authentication are owned by whatever fronts this server.
//!
//! # Liveness
//!
//! A writer task owns the socket's sink. Every write must finish within
//! the write wait, and a ping goes out every ping period. The read side
//! gives up when nothing (not even a pong) arrives within the pong wait.
//! Any of these failures closes the transport, which tears the session
//! down.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws?userid=7&username=alice');
//! ws.onopen = () => ws.send(JSON.stringify([17, 1]));
//! ws.onmessage = (event) => console.log(JSON.parse(event.data));
//! ```

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use landlord::{
    Identity, Session,
    net::{Transport, TransportError},
};
use serde::Deserialize;
use std::time::Duration;
use tokio::{sync::mpsc, time::timeout};

use super::AppState;
use crate::{config::ConnectionConfig, logging::log_connection};

/// Outbound frames buffered ahead of the writer task
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    userid: i64,
    username: String,
}

/// Upgrade HTTP connection to WebSocket and run a player session on it.
///
/// # Query Parameters
///
/// - `userid`: Account id, must be positive (robots use negative ids)
/// - `username`: Display name, must not be blank
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// On a bad identity, returns `400 Bad Request`.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    if query.userid <= 0 {
        return (StatusCode::BAD_REQUEST, "userid must be positive").into_response();
    }
    let name = query.username.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "username must not be blank").into_response();
    }

    let identity = Identity::new(query.userid, name);
    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

async fn handle_socket(socket: WebSocket, identity: Identity, state: AppState) {
    let user_id = identity.id;
    log_connection(user_id, "opened");

    let transport = WsTransport::new(socket, state.config.connection);
    Session::new(identity, false, state.registry.clone(), transport)
        .run()
        .await;

    log_connection(user_id, "closed");
}

/// A websocket as a session [`Transport`]. Dropping it lets the writer
/// flush queued frames and send a close frame.
pub struct WsTransport {
    outgoing: mpsc::Sender<String>,
    incoming: SplitStream<WebSocket>,
    pong_wait: Duration,
}

impl WsTransport {
    pub fn new(socket: WebSocket, connection: ConnectionConfig) -> Self {
        let (sink, incoming) = socket.split();
        let (outgoing, outbound) = mpsc::channel(OUTBOUND_CAPACITY);
        tokio::spawn(write_loop(sink, outbound, connection));
        Self {
            outgoing,
            incoming,
            pong_wait: connection.pong_wait,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let next = tokio::select! {
                next = timeout(self.pong_wait, self.incoming.next()) => next,
                _ = self.outgoing.closed() => return Err(TransportError::Closed),
            };
            match next {
                Err(_) => return Err(TransportError::ReadTimeout(self.pong_wait)),
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return Ok(None),
                Ok(Some(Ok(Message::Text(text)))) => return Ok(Some(text.to_string())),
                // Pongs only reset the read deadline.
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(e))) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

/// Drains outbound frames into the socket and keeps it alive with pings.
/// Returns, closing the outbound channel, on the first failed or late
/// write.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    connection: ConnectionConfig,
) {
    let mut ping = tokio::time::interval(connection.ping_period());
    ping.tick().await;

    loop {
        let message = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => Message::Text(frame.into()),
                None => break,
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };
        match timeout(connection.write_wait, sink.send(message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::debug!("Websocket write failed: {}", e);
                return;
            }
            Err(_) => {
                log::warn!(
                    "{}",
                    TransportError::WriteTimeout(connection.write_wait)
                );
                return;
            }
        }
    }
    let _ = timeout(connection.write_wait, sink.send(Message::Close(None))).await;
}
