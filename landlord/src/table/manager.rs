//! Room registry owning every table in the process.
//!
//! Locks are always taken in the order registry (table-id counter), room,
//! table. The table lock is never held while a room or registry lock is
//! requested.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};
use tokio::sync::{Mutex, RwLock};

use super::{
    config::{RobotConfig, RoomConfig},
    engine::{Seat, Table},
    messages::TableError,
};
use crate::game::{
    constants::MAX_PLAYERS,
    entities::{Identity, PlayerId, RoomId, TableId},
};

/// A table behind its own lock, shared by the room and the seated sessions.
pub type SharedTable = Arc<RwLock<Table>>;

/// Room metadata for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub allow_robot: bool,
    pub entrance_fee: i64,
}

#[derive(Debug)]
struct Room {
    config: RoomConfig,
    tables: HashMap<TableId, SharedTable>,
}

/// Registry of the fixed rooms and their tables
#[derive(Debug)]
pub struct RoomManager {
    /// Rooms keyed by id, each behind its own lock. The set never changes.
    rooms: HashMap<RoomId, RwLock<Room>>,

    /// Next table ID. Holding this lock is holding the registry lock.
    next_table_id: Mutex<TableId>,

    /// Robots count down from -1 so they never collide with accounts
    next_robot_id: AtomicI64,

    robot_config: RobotConfig,
}

impl Default for RoomManager {
    fn default() -> Self {
        let defaults = RoomConfig::default();
        Self::new(
            RoomConfig::default_rooms(defaults.entrance_fee, defaults.base_stake),
            RobotConfig::default(),
        )
    }
}

impl RoomManager {
    /// Create a registry with a fixed set of rooms
    ///
    /// # Arguments
    ///
    /// * `rooms` - Room ids and their configuration
    /// * `robot_config` - Pacing for robots spawned into robot rooms
    ///
    /// # Returns
    ///
    /// * `RoomManager` - New registry with no tables
    pub fn new(rooms: Vec<(RoomId, RoomConfig)>, robot_config: RobotConfig) -> Self {
        let rooms = rooms
            .into_iter()
            .map(|(id, config)| {
                let room = Room {
                    config,
                    tables: HashMap::new(),
                };
                (id, RwLock::new(room))
            })
            .collect();
        Self {
            rooms,
            next_table_id: Mutex::new(1),
            next_robot_id: AtomicI64::new(-1),
            robot_config,
        }
    }

    pub fn robot_config(&self) -> RobotConfig {
        self.robot_config
    }

    pub fn has_room(&self, room: RoomId) -> bool {
        self.rooms.contains_key(&room)
    }

    fn room(&self, room: RoomId) -> Result<&RwLock<Room>, TableError> {
        self.rooms.get(&room).ok_or(TableError::NoSuchRoom(room))
    }

    /// Get a room's configuration
    pub async fn room_config(&self, room: RoomId) -> Option<RoomConfig> {
        let room = self.rooms.get(&room)?;
        Some(room.read().await.config.clone())
    }

    /// List every room, ordered by id
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(self.rooms.len());
        for (&id, room) in &self.rooms {
            let room = room.read().await;
            summaries.push(RoomSummary {
                id,
                allow_robot: room.config.allow_robot,
                entrance_fee: room.config.entrance_fee,
            });
        }
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }

    /// Allocates the next robot identity.
    pub fn next_robot_identity(&self) -> Identity {
        let id = self.next_robot_id.fetch_sub(1, Ordering::Relaxed);
        Identity::new(id, format!("robot{}", -id))
    }

    /// Create a table and seat its creator
    ///
    /// Takes the registry lock to allocate the id, then the room lock,
    /// then the new table's lock.
    ///
    /// # Arguments
    ///
    /// * `room` - Room to create the table in
    /// * `creator` - Seat of the creating player
    ///
    /// # Returns
    ///
    /// * `Result<(TableId, SharedTable), TableError>` - New table or error
    pub async fn new_table(
        &self,
        room: RoomId,
        creator: Seat,
    ) -> Result<(TableId, SharedTable), TableError> {
        let room_lock = self.room(room)?;

        let mut next_id = self.next_table_id.lock().await;
        let mut room_guard = room_lock.write().await;
        let table_id = *next_id;
        *next_id += 1;

        let mut table = Table::new(table_id, room, &room_guard.config, creator.id());
        table.join(creator)?;
        let table = Arc::new(RwLock::new(table));
        room_guard.tables.insert(table_id, table.clone());
        drop(room_guard);
        drop(next_id);

        log::info!("Created table {} in room {}", table_id, room);
        Ok((table_id, table))
    }

    /// Get a table handle
    ///
    /// # Arguments
    ///
    /// * `room` - Room ID
    /// * `table_id` - Table ID
    ///
    /// # Returns
    ///
    /// * `Option<SharedTable>` - Table handle if found
    pub async fn table(&self, room: RoomId, table_id: TableId) -> Option<SharedTable> {
        let room = self.rooms.get(&room)?;
        room.read().await.tables.get(&table_id).cloned()
    }

    /// Join a table
    ///
    /// # Arguments
    ///
    /// * `room` - Room ID
    /// * `table_id` - Table ID
    /// * `seat` - Seat of the joining player
    ///
    /// # Returns
    ///
    /// * `Result<SharedTable, TableError>` - Table handle or error
    pub async fn join_table(
        &self,
        room: RoomId,
        table_id: TableId,
        seat: Seat,
    ) -> Result<SharedTable, TableError> {
        let room_guard = self.room(room)?.read().await;
        let table = room_guard
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(TableError::NoSuchTable(table_id))?;
        table.write().await.join(seat)?;
        Ok(table)
    }

    /// Leave a table, discarding it when fewer than two occupants remain
    /// or only robots are left
    ///
    /// # Arguments
    ///
    /// * `room` - Room ID
    /// * `table_id` - Table ID
    /// * `player` - Departing player
    ///
    /// # Returns
    ///
    /// * `Result<usize, TableError>` - Remaining occupancy or error
    pub async fn leave_table(
        &self,
        room: RoomId,
        table_id: TableId,
        player: PlayerId,
    ) -> Result<usize, TableError> {
        let mut room_guard = self.room(room)?.write().await;
        let table = room_guard
            .tables
            .get(&table_id)
            .cloned()
            .ok_or(TableError::NoSuchTable(table_id))?;

        let mut table_guard = table.write().await;
        let remaining = table_guard.leave(player)?;
        if remaining < 2 || table_guard.only_robots() {
            table_guard.close();
            drop(table_guard);
            room_guard.tables.remove(&table_id);
            log::info!("Discarded table {} from room {}", table_id, room);
        }
        Ok(remaining)
    }

    /// List tables that can be joined now
    ///
    /// # Arguments
    ///
    /// * `room` - Room ID
    ///
    /// # Returns
    ///
    /// * `Result<Vec<(TableId, usize)>, TableError>` - `(table, occupancy)`
    ///   pairs sorted by table id
    pub async fn list_joinable(&self, room: RoomId) -> Result<Vec<(TableId, usize)>, TableError> {
        let room_guard = self.room(room)?.read().await;
        let mut joinable = Vec::new();
        for (&id, table) in &room_guard.tables {
            let table = table.read().await;
            if !table.is_closed() && !table.phase().in_hand() && table.occupancy() < MAX_PLAYERS {
                joinable.push((id, table.occupancy()));
            }
        }
        joinable.sort_unstable_by_key(|&(id, _)| id);
        Ok(joinable)
    }

    /// Get active table count across rooms
    pub async fn active_table_count(&self) -> usize {
        let mut count = 0;
        for room in self.rooms.values() {
            count += room.read().await.tables.len();
        }
        count
    }
}
