//! Robot players.
//!
//! A robot is an ordinary [`Session`] whose transport is an in-process
//! channel pair. The [`RobotDriver`] on the other end of the pair reads
//! the frames the session writes, decides, and writes requests back, so
//! robots go through exactly the same checks as human players.

use futures_util::FutureExt;
use std::{sync::Arc, time::Duration};

use super::{
    memory::RobotMemory,
    transport::{RobotLink, RobotTransport},
};
use crate::{
    game::{
        constants::MAX_PLAYERS,
        entities::{Identity, RoomId, TableId},
    },
    net::{Request, ServerMessage},
    session::{Session, SessionError},
    table::{RoomManager, TableEvent, TablePhase},
};

pub struct RobotDriver {
    identity: Identity,
    memory: RobotMemory,
    link: RobotLink,
    think_time: Duration,
}

impl RobotDriver {
    pub fn new(identity: Identity, link: RobotLink, think_time: Duration) -> Self {
        let memory = RobotMemory::new(identity.id);
        Self {
            identity,
            memory,
            link,
            think_time,
        }
    }

    pub fn memory(&self) -> &RobotMemory {
        &self.memory
    }

    /// Reads frames until the session goes away, answering each one that
    /// calls for an action.
    pub async fn run(mut self) {
        while let Some(frame) = self.link.events.recv().await {
            let event = match ServerMessage::decode(&frame) {
                Ok(ServerMessage::Event(event)) => event,
                Ok(ServerMessage::Reply(_)) => continue,
                Err(e) => {
                    log::warn!("Robot {}: undecodable frame: {}", self.identity, e);
                    continue;
                }
            };
            let Some(request) = self.react(&event) else {
                continue;
            };
            if !self.think().await {
                break;
            }
            log::debug!("Robot {}: {}", self.identity, request);
            if self.link.requests.send(request.encode()).await.is_err() {
                break;
            }
        }
        log::debug!("Robot {} stopped", self.identity);
    }

    /// Updates memory with `event` and returns the request it calls for.
    pub fn react(&mut self, event: &TableEvent) -> Option<Request> {
        self.memory.observe(event);
        match event {
            TableEvent::GameOver(_) => Some(Request::Restart),
            TableEvent::Turn(_) | TableEvent::Sync(_) if self.memory.is_my_turn() => {
                match self.memory.phase() {
                    TablePhase::Bidding if self.memory.should_bid() => {
                        Some(Request::Bid(self.memory.choose_bid()))
                    }
                    TablePhase::Playing => Some(Request::Play(self.memory.choose_play())),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Waits out the think time. `false` if the session went away
    /// meanwhile.
    async fn think(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.think_time) => true,
            _ = self.link.requests.closed() => false,
        }
    }
}

/// Starts a robot in `room`, opening a new table when `table` is `None`
/// and joining `table` otherwise.
///
/// # Returns
///
/// * `Result<(Identity, TableId), SessionError>` - The robot and the table it sits at
pub async fn spawn_robot(
    registry: &Arc<RoomManager>,
    room: RoomId,
    table: Option<TableId>,
) -> Result<(Identity, TableId), SessionError> {
    let identity = registry.next_robot_identity();
    let (transport, link) = RobotTransport::pair();
    let mut session = Session::new(identity.clone(), true, registry.clone(), transport);
    let table = match table {
        Some(table) => {
            session.join_table(room, table).await?;
            table
        }
        None => session.open_table(room).await?,
    };

    let driver = RobotDriver::new(identity.clone(), link, registry.robot_config().think_time);
    tokio::spawn(session.run());
    tokio::spawn(driver.run());
    Ok((identity, table))
}

/// Schedules robots to take every seat still empty at `table` once the
/// fill delay has passed.
pub fn fill_table_after(registry: Arc<RoomManager>, room: RoomId, table: TableId) {
    let fill = async move {
        tokio::time::sleep(registry.robot_config().fill_delay).await;
        let Some(handle) = registry.table(room, table).await else {
            return;
        };
        let empty = {
            let handle = handle.read().await;
            if handle.is_closed() {
                return;
            }
            MAX_PLAYERS.saturating_sub(handle.occupancy())
        };

        for _ in 0..empty {
            match spawn_robot(&registry, room, Some(table)).await {
                Ok((identity, _)) => {
                    log::info!("Robot {} took a seat at table {}", identity, table)
                }
                Err(e) => {
                    log::debug!("Table {}: robot fill stopped: {}", table, e);
                    break;
                }
            }
        }
    }
    .boxed();
    tokio::spawn(fill);
}
