//! What a robot remembers about its table, rebuilt from the events it
//! receives. Robots see exactly what a human client sees.

use crate::{
    game::{
        constants::MAX_BID,
        entities::{Card, PlayerId, sort_hand},
        legality::legal_subset_above,
    },
    table::{TableEvent, TablePhase},
};

#[derive(Clone, Debug)]
pub struct RobotMemory {
    me: PlayerId,
    phase: TablePhase,
    hand: Vec<Card>,
    highest_bid: u8,
    has_bid: bool,
    landlord: Option<PlayerId>,
    last_play: Vec<Card>,
    last_player: Option<PlayerId>,
    turn: Option<PlayerId>,
}

impl RobotMemory {
    pub fn new(me: PlayerId) -> Self {
        Self {
            me,
            phase: TablePhase::Waiting,
            hand: Vec::new(),
            highest_bid: 0,
            has_bid: false,
            landlord: None,
            last_play: Vec::new(),
            last_player: None,
            turn: None,
        }
    }

    pub fn phase(&self) -> TablePhase {
        self.phase
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn landlord(&self) -> Option<PlayerId> {
        self.landlord
    }

    pub fn is_my_turn(&self) -> bool {
        self.turn == Some(self.me)
    }

    /// Folds one event into memory.
    pub fn observe(&mut self, event: &TableEvent) {
        match event {
            TableEvent::Deal(hand) => {
                self.phase = TablePhase::Bidding;
                self.hand.clone_from(hand);
                self.highest_bid = 0;
                self.has_bid = false;
                self.landlord = None;
                self.last_play.clear();
                self.last_player = None;
                self.turn = None;
            }
            TableEvent::Bid { player, amount, .. } => {
                if *player == self.me {
                    self.has_bid = true;
                }
                self.highest_bid = self.highest_bid.max(*amount);
            }
            TableEvent::Kitty { landlord, kitty, .. } => {
                self.phase = TablePhase::Playing;
                self.landlord = Some(*landlord);
                if *landlord == self.me {
                    self.hand.extend_from_slice(kitty);
                    sort_hand(&mut self.hand);
                }
                self.last_play.clear();
                self.last_player = None;
            }
            TableEvent::Play { player, cards } if !cards.is_empty() => {
                if *player == self.me {
                    self.hand.retain(|card| !cards.contains(card));
                }
                self.last_play.clone_from(cards);
                self.last_player = Some(*player);
            }
            TableEvent::Turn(player) => self.turn = Some(*player),
            TableEvent::GameOver(_) => {
                self.phase = TablePhase::Finished;
                self.turn = None;
            }
            TableEvent::Sync(snapshot) => {
                self.phase = snapshot.phase;
                self.hand.clone_from(&snapshot.hand);
                self.turn = snapshot.turn;
                self.last_play.clone_from(&snapshot.last_play);
                self.last_player = snapshot.last_player;
            }
            _ => {}
        }
    }

    /// The lowest bid the table accepts.
    pub fn choose_bid(&self) -> u8 {
        self.highest_bid.clamp(1, MAX_BID)
    }

    /// Whether the robot still owes a bid this hand.
    pub fn should_bid(&self) -> bool {
        self.phase == TablePhase::Bidding && !self.has_bid
    }

    /// The cards to play on this robot's turn. Leads when its own play
    /// came back around.
    pub fn choose_play(&self) -> Vec<Card> {
        let leading = self.last_player.is_none_or(|last| last == self.me);
        let last: &[Card] = if leading { &[] } else { &self.last_play };
        legal_subset_above(&self.hand, last).collect()
    }
}
