//! Tables and the rooms that hold them.
//!
//! This module implements:
//! - Table: the per-table state machine (seating, bidding, play, settlement)
//! - RoomManager: the process-wide registry of fixed rooms and their tables
//! - Room and robot configuration
//!
//! ## Locking
//!
//! Each table sits behind its own `RwLock`. Table methods never await and
//! push events into occupants' session channels with `try_send`. Locks are
//! always acquired registry, then room, then table.

pub mod config;
pub mod engine;
pub mod manager;
pub mod messages;

pub use config::{RobotConfig, RoomConfig};
pub use engine::{Seat, Table};
pub use manager::{RoomManager, RoomSummary, SharedTable};
pub use messages::{
    BidOutcome, PlayOutcome, Settlement, Snapshot, TableError, TableEvent, TablePhase,
};
