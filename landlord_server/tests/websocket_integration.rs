//! WebSocket integration tests for real-time landlord gameplay.
//!
//! Tests the health endpoint, connection identity checks, request/response
//! frames and a full table over real sockets.

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use futures_util::{SinkExt, StreamExt};
use landlord::{
    RoomManager,
    net::{Request, Response, ServerMessage},
    table::{RobotConfig, TableEvent},
};
use landlord_server::{
    api::{AppState, create_router},
    config::ServerConfig,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper to create application state with fast robots
fn test_state(fill_delay: Duration) -> AppState {
    let mut config = ServerConfig::from_env(None);
    config.robots = RobotConfig {
        think_time: Duration::from_millis(1),
        fill_delay,
    };
    AppState {
        registry: Arc::new(RoomManager::new(config.room_configs(), config.robots)),
        config: Arc::new(config),
    }
}

/// Helper to serve the router on a random local port
async fn spawn_server(fill_delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(test_state(fill_delay));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, id: i64, name: &str) -> Client {
    let url = format!("ws://{addr}/ws?userid={id}&username={name}");
    let (client, _) = connect_async(url).await.unwrap();
    client
}

async fn send(client: &mut Client, request: Request) {
    client.send(Message::text(request.encode())).await.unwrap();
}

/// Reads frames until `matches` accepts one, skipping the rest
async fn expect<F>(client: &mut Client, mut matches: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(frame) = client.next().await {
            if let Message::Text(text) = frame.unwrap() {
                let message = ServerMessage::decode(text.as_str()).unwrap();
                if matches(&message) {
                    return message;
                }
            }
        }
        panic!("connection closed");
    })
    .await
    .expect("timed out waiting for frame")
}

// ============================================================================
// HTTP Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router(test_state(Duration::from_secs(3)));

    let request = HttpRequest::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_websocket_rejects_bad_identity() {
    let addr = spawn_server(Duration::from_secs(3)).await;

    let result = connect_async(format!("ws://{addr}/ws?userid=0&username=alice")).await;
    assert!(result.is_err(), "non-positive userid should be rejected");

    let result = connect_async(format!("ws://{addr}/ws?username=alice")).await;
    assert!(result.is_err(), "missing userid should be rejected");
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_identify_and_room_listing() {
    let addr = spawn_server(Duration::from_secs(3)).await;
    let mut alice = connect(addr, 7, "alice").await;

    send(&mut alice, Request::Identify).await;
    let reply = expect(&mut alice, |_| true).await;
    let ServerMessage::Reply(Response::Identity(identity)) = reply else {
        panic!("expected identity, got {reply:?}");
    };
    assert_eq!(identity.id, 7);
    assert_eq!(identity.name, "alice");

    send(&mut alice, Request::ListRooms).await;
    let reply = expect(&mut alice, |_| true).await;
    let ServerMessage::Reply(Response::Rooms(rooms)) = reply else {
        panic!("expected rooms, got {reply:?}");
    };
    assert_eq!(rooms.len(), 2);
}

#[tokio::test]
async fn test_bad_frames_do_not_close_session() {
    let addr = spawn_server(Duration::from_secs(3)).await;
    let mut alice = connect(addr, 7, "alice").await;

    alice.send(Message::text("not json")).await.unwrap();
    alice.send(Message::text("[99]")).await.unwrap();
    send(&mut alice, Request::Bid(3)).await;
    send(&mut alice, Request::Identify).await;

    let reply = expect(&mut alice, |_| true).await;
    assert!(matches!(reply, ServerMessage::Reply(Response::Identity(_))));
}

#[tokio::test]
async fn test_three_players_are_dealt_in() {
    let addr = spawn_server(Duration::from_secs(3)).await;
    let mut alice = connect(addr, 1, "alice").await;
    let mut bob = connect(addr, 2, "bob").await;
    let mut carol = connect(addr, 3, "carol").await;

    send(&mut alice, Request::JoinRoom(2)).await;
    expect(&mut alice, |m| {
        matches!(m, ServerMessage::Reply(Response::JoinedRoom(_)))
    })
    .await;
    send(&mut alice, Request::NewTable).await;
    let ServerMessage::Reply(Response::TableCreated(table)) = expect(&mut alice, |m| {
        matches!(m, ServerMessage::Reply(Response::TableCreated(_)))
    })
    .await
    else {
        unreachable!();
    };

    for client in [&mut bob, &mut carol] {
        send(client, Request::JoinRoom(2)).await;
        let ServerMessage::Reply(Response::JoinedRoom(tables)) = expect(client, |m| {
            matches!(m, ServerMessage::Reply(Response::JoinedRoom(_)))
        })
        .await
        else {
            unreachable!();
        };
        assert!(tables.iter().any(|(id, _)| *id == table));
        send(client, Request::JoinTable(table)).await;
    }

    for client in [&mut alice, &mut bob, &mut carol] {
        let deal = expect(client, |m| {
            matches!(m, ServerMessage::Event(TableEvent::Deal(_)))
        })
        .await;
        let ServerMessage::Event(TableEvent::Deal(hand)) = deal else {
            unreachable!();
        };
        assert_eq!(hand.len(), 17);
    }

    // The creator opens the bidding.
    send(&mut alice, Request::Bid(3)).await;
    let kitty = expect(&mut bob, |m| {
        matches!(m, ServerMessage::Event(TableEvent::Kitty { .. }))
    })
    .await;
    assert!(matches!(
        kitty,
        ServerMessage::Event(TableEvent::Kitty { landlord: 1, multiplier: 3, .. })
    ));
}

#[tokio::test]
async fn test_robots_fill_table_in_robot_room() {
    let addr = spawn_server(Duration::from_millis(10)).await;
    let mut alice = connect(addr, 1, "alice").await;

    send(&mut alice, Request::JoinRoom(1)).await;
    send(&mut alice, Request::NewTable).await;

    let deal = expect(&mut alice, |m| {
        matches!(m, ServerMessage::Event(TableEvent::Deal(_)))
    })
    .await;
    assert!(matches!(deal, ServerMessage::Event(TableEvent::Deal(hand)) if hand.len() == 17));
}
