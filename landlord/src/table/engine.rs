//! Table state machine: seating, bidding, card play and settlement.
//!
//! A [`Table`] is plain data guarded by the registry's per-table lock. It
//! never awaits; every event it produces is pushed into the occupants'
//! session channels with `try_send`, so a slow or vanished session can
//! never stall the lock holder.

use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{
    config::RoomConfig,
    messages::{
        BidOutcome, PlayOutcome, Settlement, Snapshot, TableError, TableEvent, TablePhase,
    },
};
use crate::game::{
    constants::{MAX_BID, MAX_CHAT_LENGTH, MAX_HAND_SIZE, MAX_PLAYERS},
    entities::{Card, Deck, Identity, PlayerId, RoomId, TableId, sort_hand},
    legality::{Outrank, compare_against_last},
    ring::TurnRing,
};

/// The table-owned part of a player session.
#[derive(Debug)]
pub struct Seat {
    identity: Identity,
    hand: Vec<Card>,
    ready: bool,
    has_bid: bool,
    robot: bool,
    sender: mpsc::Sender<TableEvent>,
}

impl Seat {
    pub fn new(identity: Identity, robot: bool, sender: mpsc::Sender<TableEvent>) -> Self {
        Self {
            identity,
            hand: Vec::with_capacity(MAX_HAND_SIZE),
            ready: false,
            has_bid: false,
            robot,
            sender,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn hand(&self) -> &[Card] {
        &self.hand
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn has_bid(&self) -> bool {
        self.has_bid
    }

    pub fn is_robot(&self) -> bool {
        self.robot
    }

    fn send(&self, table: TableId, event: TableEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::warn!(
                    "Table {}: {} channel full, dropping '{}'",
                    table,
                    self.identity,
                    event
                );
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Table {}: {} channel closed", table, self.identity);
            }
        }
    }
}

/// Per-hand state. Cleared by [`Table::reset`] and on every deal.
#[derive(Debug)]
struct GameState {
    /// Everyone dealt into the hand, in seating order. Departures do not
    /// remove anyone, so settlement always covers the whole hand.
    dealt: Vec<PlayerId>,
    highest_bid: u8,
    bid_holder: Option<PlayerId>,
    first_bidder: Option<PlayerId>,
    landlord: Option<PlayerId>,
    kitty: Vec<Card>,
    last_play: Vec<Card>,
    last_player: Option<PlayerId>,
    multiplier: u32,
    accepted_plays: HashMap<PlayerId, u32>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            dealt: Vec::new(),
            highest_bid: 0,
            bid_holder: None,
            first_bidder: None,
            landlord: None,
            kitty: Vec::new(),
            last_play: Vec::new(),
            last_player: None,
            multiplier: 1,
            accepted_plays: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct Table {
    id: TableId,
    room: RoomId,
    base_stake: i64,
    creator: PlayerId,
    seats: HashMap<PlayerId, Seat>,
    ring: TurnRing,
    phase: TablePhase,
    game: GameState,
    deck: Deck,
    hands_completed: u64,
    closed: bool,
}

impl Table {
    /// Creates an empty table. The creator is seated with [`Table::join`].
    pub fn new(id: TableId, room: RoomId, config: &RoomConfig, creator: PlayerId) -> Self {
        Self {
            id,
            room,
            base_stake: config.base_stake,
            creator,
            seats: HashMap::with_capacity(MAX_PLAYERS),
            ring: TurnRing::new(),
            phase: TablePhase::Waiting,
            game: GameState::default(),
            deck: Deck::default(),
            hands_completed: 0,
            closed: false,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    pub fn creator(&self) -> PlayerId {
        self.creator
    }

    pub fn phase(&self) -> TablePhase {
        self.phase
    }

    pub fn occupancy(&self) -> usize {
        self.seats.len()
    }

    /// Hands played to a settlement since the table was created.
    pub fn hands_completed(&self) -> u64 {
        self.hands_completed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.seats.contains_key(&player)
    }

    pub fn seat(&self, player: PlayerId) -> Option<&Seat> {
        self.seats.get(&player)
    }

    pub fn hand(&self, player: PlayerId) -> Option<&[Card]> {
        self.seats.get(&player).map(Seat::hand)
    }

    pub fn ring(&self) -> &TurnRing {
        &self.ring
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        self.ring.current()
    }

    pub fn first_bidder(&self) -> Option<PlayerId> {
        self.game.first_bidder
    }

    pub fn highest_bid(&self) -> u8 {
        self.game.highest_bid
    }

    pub fn landlord(&self) -> Option<PlayerId> {
        self.game.landlord
    }

    pub fn multiplier(&self) -> u32 {
        self.game.multiplier
    }

    pub fn last_play(&self) -> (&[Card], Option<PlayerId>) {
        (&self.game.last_play, self.game.last_player)
    }

    /// `(id, name)` of every occupant in seating order.
    pub fn occupants(&self) -> Vec<(PlayerId, String)> {
        self.ring
            .members()
            .iter()
            .filter_map(|id| self.seats.get(id))
            .map(|seat| (seat.id(), seat.name().to_string()))
            .collect()
    }

    /// Whether every remaining occupant is a robot.
    pub fn only_robots(&self) -> bool {
        self.seats.values().all(Seat::is_robot)
    }

    /// Marks the table as discarded from its room and unseats whoever is
    /// left. Dropping the seats closes their event channels, which tells
    /// their sessions the table is gone.
    pub fn close(&mut self) {
        self.closed = true;
        self.seats.clear();
        self.ring = TurnRing::new();
        log::info!("Table {} closed", self.id);
    }

    fn broadcast(&self, event: TableEvent) {
        for id in self.ring.members() {
            if let Some(seat) = self.seats.get(id) {
                seat.send(self.id, event.clone());
            }
        }
    }

    fn send_to(&self, player: PlayerId, event: TableEvent) {
        if let Some(seat) = self.seats.get(&player) {
            seat.send(self.id, event);
        }
    }

    fn occupants_event(&self) -> TableEvent {
        TableEvent::Occupants {
            table: self.id,
            occupants: self.occupants(),
        }
    }

    fn expect_seated(&self, player: PlayerId) -> Result<(), TableError> {
        if self.seats.contains_key(&player) {
            Ok(())
        } else {
            Err(TableError::NotSeated(player))
        }
    }

    fn expect_phase(&self, expected: TablePhase) -> Result<(), TableError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(TableError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// The turn holder acts; before a turn is assigned only the first
    /// bidder may open the bidding.
    fn may_act(&self, player: PlayerId) -> bool {
        match self.ring.current() {
            Some(turn) => turn == player,
            None => self.phase == TablePhase::Bidding && self.game.first_bidder == Some(player),
        }
    }

    /// Seats a player. The third occupant of a waiting table starts a hand.
    ///
    /// # Returns
    ///
    /// * `Result<usize, TableError>` - Occupancy after joining
    pub fn join(&mut self, seat: Seat) -> Result<usize, TableError> {
        if self.closed {
            return Err(TableError::Closed);
        }
        let id = seat.id();
        if self.seats.contains_key(&id) {
            return Err(TableError::AlreadySeated(id));
        }
        if self.seats.len() >= MAX_PLAYERS {
            return Err(TableError::TableFull);
        }
        if self.phase.in_hand() {
            return Err(TableError::HandInProgress);
        }

        log::info!("Table {}: {} joined", self.id, seat.identity);
        self.seats.insert(id, seat);
        self.ring.link(id);
        self.broadcast(self.occupants_event());

        if self.seats.len() == MAX_PLAYERS && self.phase == TablePhase::Waiting {
            self.start_hand();
        }
        Ok(self.seats.len())
    }

    /// Shuffles, deals and opens the bidding.
    fn start_hand(&mut self) {
        self.game = GameState {
            dealt: self.ring.members().to_vec(),
            ..GameState::default()
        };
        self.deck.shuffle();
        let (hands, kitty) = self.deck.deal();
        for (id, hand) in self.ring.members().iter().zip(hands) {
            if let Some(seat) = self.seats.get_mut(id) {
                seat.hand = hand;
                seat.has_bid = false;
                seat.ready = false;
            }
        }
        self.game.kitty = kitty;

        let first = if self.seats.contains_key(&self.creator) {
            Some(self.creator)
        } else {
            self.ring.members().first().copied()
        };
        self.game.first_bidder = first;
        self.ring.clear_current();
        self.phase = TablePhase::Bidding;
        log::info!("Table {}: hand dealt", self.id);

        for id in self.ring.members() {
            if let Some(seat) = self.seats.get(id) {
                seat.send(self.id, TableEvent::Deal(seat.hand.clone()));
            }
        }
        if let Some(first) = first {
            self.broadcast(TableEvent::Turn(first));
        }
    }

    /// Records a bid. `0` passes; any other amount must lie between the
    /// highest bid so far and [`MAX_BID`]. Only a strictly higher bid
    /// takes the lead.
    pub fn bid(&mut self, player: PlayerId, amount: u8) -> Result<BidOutcome, TableError> {
        self.expect_seated(player)?;
        self.expect_phase(TablePhase::Bidding)?;
        if !self.may_act(player) {
            return Err(TableError::NotYourTurn(player));
        }
        if self.seats.get(&player).is_some_and(Seat::has_bid) {
            return Err(TableError::AlreadyBid(player));
        }
        let highest = self.game.highest_bid;
        if amount != 0 && !(highest..=MAX_BID).contains(&amount) {
            return Err(TableError::InvalidBid { amount, highest });
        }

        if let Some(seat) = self.seats.get_mut(&player) {
            seat.has_bid = true;
        }
        if amount > highest {
            self.game.highest_bid = amount;
            self.game.bid_holder = Some(player);
        }
        let ended = amount == MAX_BID || self.seats.values().all(Seat::has_bid);
        log::debug!("Table {}: {} bid {}", self.id, player, amount);
        self.broadcast(TableEvent::Bid {
            player,
            amount,
            ended,
        });

        if !ended {
            if let Some(next) = self.ring.advance_from(player) {
                self.broadcast(TableEvent::Turn(next));
            }
            return Ok(BidOutcome::Continue);
        }
        Ok(self.finish_bidding())
    }

    fn finish_bidding(&mut self) -> BidOutcome {
        match self.game.bid_holder {
            Some(landlord) if self.seats.contains_key(&landlord) => {
                let kitty = self.game.kitty.clone();
                if let Some(seat) = self.seats.get_mut(&landlord) {
                    seat.hand.extend_from_slice(&kitty);
                    sort_hand(&mut seat.hand);
                }
                self.game.landlord = Some(landlord);
                self.game.multiplier = u32::from(self.game.highest_bid);
                self.game.last_play.clear();
                self.game.last_player = None;
                self.phase = TablePhase::Playing;
                self.ring.set_current(landlord);
                log::info!(
                    "Table {}: {} is landlord at x{}",
                    self.id,
                    landlord,
                    self.game.multiplier
                );

                self.broadcast(TableEvent::Kitty {
                    landlord,
                    kitty,
                    multiplier: self.game.multiplier,
                });
                self.broadcast(TableEvent::Turn(landlord));
                BidOutcome::Landlord(landlord)
            }
            _ if self.seats.len() == MAX_PLAYERS => {
                log::info!("Table {}: everyone passed, redealing", self.id);
                self.start_hand();
                BidOutcome::Redeal
            }
            _ => {
                log::info!("Table {}: bidding abandoned", self.id);
                self.reset();
                BidOutcome::Abandoned
            }
        }
    }

    /// Plays cards for the turn holder.
    ///
    /// Cards the player does not hold, and plays that do not beat the last
    /// play, are broadcast as an empty play and pass the turn like an
    /// explicit pass. A player whose own play came back around leads
    /// again and may play any combination.
    pub fn play(&mut self, player: PlayerId, cards: Vec<Card>) -> Result<PlayOutcome, TableError> {
        self.expect_seated(player)?;
        self.expect_phase(TablePhase::Playing)?;
        if self.ring.current() != Some(player) {
            return Err(TableError::NotYourTurn(player));
        }

        let held = self
            .seats
            .get(&player)
            .is_some_and(|seat| holds(&seat.hand, &cards));
        if !held {
            log::warn!("Table {}: {} played cards not in hand", self.id, player);
            return Ok(self.pass_turn(player, PlayOutcome::Rejected));
        }
        if cards.is_empty() {
            return Ok(self.pass_turn(player, PlayOutcome::Passed));
        }

        let leading = self.game.last_player.is_none_or(|last| last == player);
        let last: &[Card] = if leading { &[] } else { &self.game.last_play };
        let (outrank, doubles) = compare_against_last(last, &cards);
        if outrank != Outrank::Beats {
            log::debug!("Table {}: {} play rejected ({:?})", self.id, player, outrank);
            return Ok(self.pass_turn(player, PlayOutcome::Rejected));
        }

        if let Some(seat) = self.seats.get_mut(&player) {
            remove_cards(&mut seat.hand, &cards);
        }
        if doubles {
            self.game.multiplier = self.game.multiplier.saturating_mul(2);
        }
        *self.game.accepted_plays.entry(player).or_default() += 1;
        self.game.last_play.clone_from(&cards);
        self.game.last_player = Some(player);
        log::debug!("Table {}: {} played {} cards", self.id, player, cards.len());
        self.broadcast(TableEvent::Play { player, cards });

        if self.seats.get(&player).is_some_and(|seat| seat.hand.is_empty()) {
            return Ok(PlayOutcome::HandOver(self.settle(player)));
        }
        if let Some(next) = self.ring.advance_from(player) {
            self.broadcast(TableEvent::Turn(next));
        }
        Ok(PlayOutcome::Accepted)
    }

    fn pass_turn(&mut self, player: PlayerId, outcome: PlayOutcome) -> PlayOutcome {
        self.broadcast(TableEvent::Play {
            player,
            cards: Vec::new(),
        });
        if let Some(next) = self.ring.advance_from(player) {
            self.broadcast(TableEvent::Turn(next));
        }
        outcome
    }

    /// Scores the hand won by `winner` and moves to [`TablePhase::Finished`].
    fn settle(&mut self, winner: PlayerId) -> Settlement {
        let landlord = self.game.landlord;
        let landlord_won = landlord == Some(winner);
        let plays = |id: PlayerId| self.game.accepted_plays.get(&id).copied().unwrap_or(0);
        let farmers: Vec<PlayerId> = self
            .game
            .dealt
            .iter()
            .copied()
            .filter(|&id| Some(id) != landlord)
            .collect();

        let spring = if landlord_won {
            farmers.iter().all(|&farmer| plays(farmer) == 0)
        } else {
            landlord.is_some_and(|landlord| plays(landlord) == 1)
        };
        if spring {
            self.game.multiplier = self.game.multiplier.saturating_mul(2);
        }

        let unit = self.base_stake * i64::from(self.game.multiplier);
        let farmer_delta = if landlord_won { -unit } else { unit };
        let deltas = self
            .game
            .dealt
            .iter()
            .map(|&id| {
                if Some(id) == landlord {
                    (id, -farmer_delta * farmers.len() as i64)
                } else {
                    (id, farmer_delta)
                }
            })
            .collect();

        let settlement = Settlement {
            winner,
            landlord,
            landlord_won,
            spring,
            multiplier: self.game.multiplier,
            deltas,
        };
        self.phase = TablePhase::Finished;
        self.hands_completed += 1;
        self.ring.clear_current();
        for seat in self.seats.values_mut() {
            seat.ready = false;
        }
        log::info!(
            "Table {}: {} won, landlord {} at x{}{}",
            self.id,
            winner,
            if landlord_won { "won" } else { "lost" },
            settlement.multiplier,
            if spring { " (spring)" } else { "" }
        );
        self.broadcast(TableEvent::GameOver(settlement.clone()));
        settlement
    }

    /// Flags a player as ready after a finished hand.
    pub fn mark_ready(&mut self, player: PlayerId) -> Result<(), TableError> {
        self.expect_seated(player)?;
        self.expect_phase(TablePhase::Finished)?;
        if let Some(seat) = self.seats.get_mut(&player) {
            seat.ready = true;
        }
        self.broadcast(TableEvent::Ready(player));
        Ok(())
    }

    /// Records a restart vote. The table resets once every occupant is
    /// ready.
    ///
    /// # Returns
    ///
    /// * `Result<bool, TableError>` - Whether the vote reset the table
    pub fn vote_ready(&mut self, player: PlayerId) -> Result<bool, TableError> {
        self.expect_seated(player)?;
        self.expect_phase(TablePhase::Finished)?;
        if let Some(seat) = self.seats.get_mut(&player) {
            seat.ready = true;
        }
        self.broadcast(TableEvent::RestartVote(player));

        if self.seats.values().all(Seat::is_ready) {
            self.reset();
            return Ok(true);
        }
        Ok(false)
    }

    /// Clears all hand state. A full table is dealt a fresh hand at once;
    /// otherwise it waits for more occupants.
    pub fn reset(&mut self) {
        self.game = GameState::default();
        for seat in self.seats.values_mut() {
            seat.hand.clear();
            seat.ready = false;
            seat.has_bid = false;
        }
        self.ring.clear_current();
        self.phase = TablePhase::Waiting;
        log::info!("Table {}: reset", self.id);

        if self.seats.len() == MAX_PLAYERS {
            self.start_hand();
        }
    }

    /// Removes a player, repairing the ring and handing creatorship and
    /// the first bid to the departing seat's successor. Mid-hand the
    /// remaining occupants are resynchronised; the hand is not settled.
    ///
    /// # Returns
    ///
    /// * `Result<usize, TableError>` - Occupancy after leaving
    pub fn leave(&mut self, player: PlayerId) -> Result<usize, TableError> {
        let seat = self
            .seats
            .remove(&player)
            .ok_or(TableError::NotSeated(player))?;
        let successor = self.ring.unlink(player);
        log::info!("Table {}: {} left", self.id, seat.identity);

        if self.creator == player
            && let Some(successor) = successor
        {
            self.creator = successor;
        }
        if self.game.first_bidder == Some(player) {
            self.game.first_bidder = successor;
        }
        if self.game.last_player == Some(player) {
            self.game.last_play.clear();
            self.game.last_player = None;
        }
        if self.game.bid_holder == Some(player) {
            self.game.bid_holder = None;
            self.game.highest_bid = 0;
        }

        if self.seats.is_empty() {
            return Ok(0);
        }
        self.broadcast(self.occupants_event());

        match self.phase {
            TablePhase::Bidding if self.seats.values().all(Seat::has_bid) => {
                self.finish_bidding();
            }
            TablePhase::Finished if self.seats.values().all(Seat::is_ready) => {
                self.reset();
            }
            _ => {}
        }
        if self.phase.in_hand() {
            self.resync();
        }
        Ok(self.seats.len())
    }

    fn resync(&self) {
        for &id in self.ring.members() {
            self.send_to(id, TableEvent::Sync(self.snapshot(id)));
        }
    }

    /// The table as seen by `player`.
    pub fn snapshot(&self, player: PlayerId) -> Snapshot {
        Snapshot {
            phase: self.phase,
            turn: self.ring.current().or(match self.phase {
                TablePhase::Bidding => self.game.first_bidder,
                _ => None,
            }),
            last_player: self.game.last_player,
            last_play: self.game.last_play.clone(),
            multiplier: self.game.multiplier,
            hand: self.hand(player).map(<[Card]>::to_vec).unwrap_or_default(),
            occupants: self
                .ring
                .members()
                .iter()
                .filter_map(|id| self.seats.get(id))
                .map(|seat| (seat.id(), seat.name().to_string(), seat.hand.len()))
                .collect(),
        }
    }

    /// Broadcasts a chat line, truncated to [`MAX_CHAT_LENGTH`] characters.
    pub fn chat(&self, player: PlayerId, text: &str) -> Result<(), TableError> {
        let seat = self.seats.get(&player).ok_or(TableError::NotSeated(player))?;
        let text: String = text.chars().take(MAX_CHAT_LENGTH).collect();
        self.broadcast(TableEvent::Chat {
            player,
            name: seat.name().to_string(),
            text,
        });
        Ok(())
    }
}

/// Multiset containment: every card in `cards` is in `hand`, counting
/// repeats.
fn holds(hand: &[Card], cards: &[Card]) -> bool {
    let mut remaining = hand.to_vec();
    cards
        .iter()
        .all(|card| match remaining.iter().position(|c| c == card) {
            Some(i) => {
                remaining.swap_remove(i);
                true
            }
            None => false,
        })
}

fn remove_cards(hand: &mut Vec<Card>, cards: &[Card]) {
    for card in cards {
        if let Some(i) = hand.iter().position(|c| c == card) {
            hand.remove(i);
        }
    }
}
