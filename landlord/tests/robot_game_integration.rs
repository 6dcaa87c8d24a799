/// Integration tests for robot-filled tables
///
/// These tests let robots play whole hands against each other (and
/// alongside a scripted human) through real sessions.
use landlord::{
    bot::{RobotTransport, spawn_robot},
    game::Identity,
    net::{Request, Response, ServerMessage},
    session::Session,
    table::{RobotConfig, RoomConfig, RoomManager, TableEvent},
};
use std::{sync::Arc, time::Duration};

fn fast_registry() -> Arc<RoomManager> {
    Arc::new(RoomManager::new(
        RoomConfig::default_rooms(200, 1),
        RobotConfig {
            think_time: Duration::from_millis(1),
            fill_delay: Duration::from_millis(1),
        },
    ))
}

#[tokio::test]
async fn test_robots_finish_a_hand() {
    let registry = fast_registry();
    let (_, table) = spawn_robot(&registry, 1, None).await.unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            if let Some(handle) = registry.table(1, table).await
                && handle.read().await.hands_completed() >= 1
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(finished.is_ok(), "robots did not finish a hand in time");
}

#[tokio::test]
async fn test_robots_join_human_table() {
    let registry = fast_registry();
    let (transport, mut link) = RobotTransport::pair();
    let session = Session::new(Identity::new(100, "alice"), false, registry.clone(), transport);
    tokio::spawn(session.run());

    link.requests.send(Request::JoinRoom(1).encode()).await.unwrap();
    link.requests.send(Request::NewTable.encode()).await.unwrap();

    // Wait for the deal: two robots must have taken the empty seats.
    let dealt = tokio::time::timeout(Duration::from_secs(10), async {
        let mut created = None;
        while let Some(frame) = link.events.recv().await {
            match ServerMessage::decode(&frame).unwrap() {
                ServerMessage::Reply(Response::TableCreated(id)) => created = Some(id),
                ServerMessage::Event(TableEvent::Deal(hand)) => return (created, hand),
                _ => {}
            }
        }
        panic!("session closed before the deal");
    })
    .await
    .expect("no deal");

    let (table, hand) = dealt;
    assert_eq!(hand.len(), 17);
    let handle = registry.table(1, table.unwrap()).await.unwrap();
    let handle = handle.read().await;
    assert_eq!(handle.occupancy(), 3);
    let robots = handle
        .occupants()
        .iter()
        .filter(|(id, _)| *id < 0)
        .count();
    assert_eq!(robots, 2);
}

#[tokio::test]
async fn test_no_robots_in_closed_room() {
    let registry = fast_registry();
    let (transport, link) = RobotTransport::pair();
    let mut session = Session::new(Identity::new(100, "alice"), false, registry.clone(), transport);
    let table = session.open_table(2).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let handle = registry.table(2, table).await.unwrap();
    assert_eq!(handle.read().await.occupancy(), 1);
    drop(link);
}

#[tokio::test]
async fn test_robots_leave_with_the_last_human() {
    let registry = fast_registry();
    let (transport, mut link) = RobotTransport::pair();
    let session = Session::new(Identity::new(100, "alice"), false, registry.clone(), transport);
    let human = tokio::spawn(session.run());

    link.requests.send(Request::JoinRoom(1).encode()).await.unwrap();
    link.requests.send(Request::NewTable.encode()).await.unwrap();
    let table = tokio::time::timeout(Duration::from_secs(10), async {
        let mut created = None;
        while let Some(frame) = link.events.recv().await {
            match ServerMessage::decode(&frame).unwrap() {
                ServerMessage::Reply(Response::TableCreated(id)) => created = Some(id),
                ServerMessage::Event(TableEvent::Deal(_)) => return created,
                _ => {}
            }
        }
        panic!("session closed before the deal");
    })
    .await
    .expect("no deal")
    .unwrap();
    let handle = registry.table(1, table).await.unwrap();

    drop(link);
    human.await.unwrap();

    assert_eq!(registry.active_table_count().await, 0);
    assert_eq!(registry.list_joinable(1).await, Ok(vec![]));
    let handle = handle.read().await;
    assert!(handle.is_closed());
    assert_eq!(handle.occupancy(), 0);
}
