//! Table event, outcome and error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::game::entities::{Card, PlayerId, RoomId, TableId};

/// Table lifecycle phase.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TablePhase {
    /// Fewer than three occupants, or waiting for a restart.
    Waiting,
    /// Cards are dealt and occupants are bidding for the landlord seat.
    Bidding,
    /// The landlord has the kitty and cards are being played.
    Playing,
    /// A hand emptied; occupants vote to restart.
    Finished,
}

impl TablePhase {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Bidding => 1,
            Self::Playing => 2,
            Self::Finished => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Waiting),
            1 => Some(Self::Bidding),
            2 => Some(Self::Playing),
            3 => Some(Self::Finished),
            _ => None,
        }
    }

    /// Whether a hand is being bid or played.
    pub fn in_hand(self) -> bool {
        matches!(self, Self::Bidding | Self::Playing)
    }
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Bidding => "bidding",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// Reasons a table refuses a request. None of these change table state.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableError {
    #[error("table is full")]
    TableFull,
    #[error("a hand is in progress")]
    HandInProgress,
    #[error("table is closed")]
    Closed,
    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),
    #[error("player {0} is not seated")]
    NotSeated(PlayerId),
    #[error("expected the {expected} phase, table is {actual}")]
    WrongPhase {
        expected: TablePhase,
        actual: TablePhase,
    },
    #[error("not player {0}'s turn")]
    NotYourTurn(PlayerId),
    #[error("player {0} already bid this round")]
    AlreadyBid(PlayerId),
    #[error("bid {amount} is invalid while the highest bid is {highest}")]
    InvalidBid { amount: u8, highest: u8 },
    #[error("room {0} does not exist")]
    NoSuchRoom(RoomId),
    #[error("table {0} does not exist")]
    NoSuchTable(TableId),
}

/// Result of an accepted bid.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BidOutcome {
    /// Bidding continues with the next occupant.
    Continue,
    /// Bidding ended and this occupant took the kitty.
    Landlord(PlayerId),
    /// Bidding ended with every occupant passing; the hand was redealt.
    Redeal,
    /// Bidding ended with every occupant passing and too few occupants
    /// to redeal.
    Abandoned,
}

/// Result of a play request from the turn holder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlayOutcome {
    /// The cards beat the last play and left the hand.
    Accepted,
    /// The player passed.
    Passed,
    /// The cards were not held, or did not beat the last play. The turn
    /// moved on as for a pass.
    Rejected,
    /// The player emptied their hand.
    HandOver(Settlement),
}

/// Score for a finished hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    pub winner: PlayerId,
    pub landlord: Option<PlayerId>,
    pub landlord_won: bool,
    pub spring: bool,
    pub multiplier: u32,
    /// Stake change for everyone dealt into the hand, in seating order,
    /// including players who left before it ended. Always sums to zero.
    pub deltas: Vec<(PlayerId, i64)>,
}

/// Personalised view of a table, sent after a departure mid-hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub phase: TablePhase,
    pub turn: Option<PlayerId>,
    pub last_player: Option<PlayerId>,
    pub last_play: Vec<Card>,
    pub multiplier: u32,
    pub hand: Vec<Card>,
    /// `(id, name, cards held)` in seating order.
    pub occupants: Vec<(PlayerId, String, usize)>,
}

/// Messages a table pushes into its occupants' session channels.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableEvent {
    Occupants {
        table: TableId,
        occupants: Vec<(PlayerId, String)>,
    },
    Ready(PlayerId),
    Bid {
        player: PlayerId,
        amount: u8,
        ended: bool,
    },
    /// An empty `cards` means the play was a pass or was rejected.
    Play {
        player: PlayerId,
        cards: Vec<Card>,
    },
    Chat {
        player: PlayerId,
        name: String,
        text: String,
    },
    RestartVote(PlayerId),
    Deal(Vec<Card>),
    Kitty {
        landlord: PlayerId,
        kitty: Vec<Card>,
        multiplier: u32,
    },
    Turn(PlayerId),
    GameOver(Settlement),
    Sync(Snapshot),
}

impl fmt::Display for TableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Occupants { table, occupants } => {
                write!(f, "table {table} has {} occupants", occupants.len())
            }
            Self::Ready(id) => write!(f, "{id} is ready"),
            Self::Bid {
                player,
                amount,
                ended,
            } => {
                write!(f, "{player} bid {amount}")?;
                if *ended {
                    write!(f, " (bidding over)")?;
                }
                Ok(())
            }
            Self::Play { player, cards } if cards.is_empty() => write!(f, "{player} passed"),
            Self::Play { player, cards } => write!(f, "{player} played {} cards", cards.len()),
            Self::Chat { name, .. } => write!(f, "{name} chatted"),
            Self::RestartVote(id) => write!(f, "{id} voted to restart"),
            Self::Deal(hand) => write!(f, "dealt {} cards", hand.len()),
            Self::Kitty {
                landlord,
                multiplier,
                ..
            } => write!(f, "{landlord} is landlord at x{multiplier}"),
            Self::Turn(id) => write!(f, "{id}'s turn"),
            Self::GameOver(settlement) => write!(f, "{} won the hand", settlement.winner),
            Self::Sync(snapshot) => write!(f, "resync in the {} phase", snapshot.phase),
        }
    }
}
