//! # Landlord
//!
//! A server engine for Dou Dizhu ("fight the landlord"), the three-player
//! shedding card game played with a 54-card deck.
//!
//! Players pick one of a fixed set of rooms, then open or join a table.
//! Once a table has three occupants each is dealt seventeen cards and
//! bidding begins. The highest bidder becomes the landlord, takes the
//! three-card kitty and leads. Players take turns playing combinations
//! that beat the last one or passing; the first to empty their hand wins
//! and stakes are settled between the landlord and the two farmers.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, combination legality and turn order
//! - [`table`]: the table state machine and the room registry
//! - [`net`]: frame encoding and the transport abstraction
//! - [`session`]: the per-connection actor
//! - [`bot`]: robots that fill empty seats in rooms that allow them
//!
//! ## Example
//!
//! ```
//! use landlord::game::{Card, Kind, classify};
//!
//! let pair: Vec<Card> = [0, 1].into_iter().filter_map(Card::new).collect();
//! assert_eq!(classify(&pair).map(|c| c.kind), Some(Kind::Pair));
//! ```

/// Card game primitives.
pub mod game;

/// Tables, rooms and their configuration.
pub mod table;

/// Wire protocol and transports.
pub mod net;

/// Player sessions.
pub mod session;

/// Robot players.
pub mod bot;

pub use game::{Card, Identity, PlayerId, RoomId, TableId};
pub use net::{Request, Response, ServerMessage, Transport, TransportError};
pub use session::{Session, SessionError};
pub use table::{RobotConfig, RoomConfig, RoomManager, Table, TableError, TableEvent, TablePhase};
