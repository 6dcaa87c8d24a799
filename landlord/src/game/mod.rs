//! Card game primitives.
//!
//! - `entities`: cards, deck and player identity
//! - `legality`: combination classification and play comparison
//! - `ring`: turn order over a table's occupants

pub mod constants;
pub mod entities;
pub mod legality;
pub mod ring;

pub use entities::{Card, Deck, Identity, PlayerId, Rank, RoomId, TableId};
pub use legality::{Combination, Kind, Outrank, classify, compare_against_last, legal_subset_above};
pub use ring::TurnRing;
