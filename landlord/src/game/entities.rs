use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{DECK_SIZE, HAND_SIZE, KITTY_SIZE, MAX_PLAYERS};

/// Account identifier. Robots get negative ids so they never collide
/// with real accounts.
pub type PlayerId = i64;

/// Process-wide table identifier.
pub type TableId = u64;

/// Room identifier.
pub type RoomId = u32;

/// Card rank, ordered by strength. The three is 0, the two is 12 and the
/// jokers are 13 and 14.
pub type Rank = u8;

pub const RANK_ACE: Rank = 11;
pub const RANK_TWO: Rank = 12;
pub const RANK_BLACK_JOKER: Rank = 13;
pub const RANK_RED_JOKER: Rank = 14;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Spade,
    Heart,
    Club,
    Diamond,
    Joker,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Spade => "♠",
            Self::Heart => "♥",
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Joker => "*",
        };
        write!(f, "{repr}")
    }
}

/// A card is its wire identifier, `0..=53`.
///
/// Ids `0..=51` are ranked cards (`rank = id / 4`, `suit = id % 4`),
/// 52 is the black joker and 53 the red joker. Ordering by id is ordering
/// by rank, ties broken by suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Card(u8);

impl Card {
    pub const BLACK_JOKER: Card = Card(52);
    pub const RED_JOKER: Card = Card(53);

    /// Returns `None` for ids outside the deck.
    pub fn new(id: u8) -> Option<Self> {
        (usize::from(id) < DECK_SIZE).then_some(Self(id))
    }

    pub fn id(self) -> u8 {
        self.0
    }

    pub fn rank(self) -> Rank {
        match self.0 {
            52 => RANK_BLACK_JOKER,
            53 => RANK_RED_JOKER,
            id => id / 4,
        }
    }

    pub fn suit(self) -> Suit {
        match self.0 {
            52 | 53 => Suit::Joker,
            id => match id % 4 {
                0 => Suit::Spade,
                1 => Suit::Heart,
                2 => Suit::Club,
                _ => Suit::Diamond,
            },
        }
    }

    pub fn is_joker(self) -> bool {
        self.0 >= 52
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value: String = match self.rank() {
            RANK_RED_JOKER => return write!(f, "RJ"),
            RANK_BLACK_JOKER => return write!(f, "BJ"),
            8 => "J".into(),
            9 => "Q".into(),
            10 => "K".into(),
            RANK_ACE => "A".into(),
            RANK_TWO => "2".into(),
            r => (r + 3).to_string(),
        };
        write!(f, "{value}{}", self.suit())
    }
}

/// Sorts a hand weakest first, the order robots and clients expect.
pub fn sort_hand(hand: &mut [Card]) {
    hand.sort_unstable();
}

/// A full 54-card deck. Instantiated once per table and reshuffled
/// each deal.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card(0); DECK_SIZE];
        for (i, card) in cards.iter_mut().enumerate() {
            *card = Card(i as u8);
        }
        Self { cards }
    }
}

impl Deck {
    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Splits the deck, in its current order, into three sorted hands
    /// and the kitty.
    pub fn deal(&self) -> ([Vec<Card>; MAX_PLAYERS], Vec<Card>) {
        let mut hands: [Vec<Card>; MAX_PLAYERS] = Default::default();
        for (seat, hand) in hands.iter_mut().enumerate() {
            let start = seat * HAND_SIZE;
            hand.extend_from_slice(&self.cards[start..start + HAND_SIZE]);
            sort_hand(hand);
        }
        let mut kitty = self.cards[DECK_SIZE - KITTY_SIZE..].to_vec();
        sort_hand(&mut kitty);
        (hands, kitty)
    }
}

/// Who a player is, as established by the session context before the
/// session actor exists.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Identity {
    pub id: PlayerId,
    pub name: String,
}

impl Identity {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // === Card Tests ===

    #[test]
    fn test_card_rejects_out_of_range_id() {
        assert!(Card::new(53).is_some());
        assert!(Card::new(54).is_none());
    }

    #[test]
    fn test_card_ranks() {
        assert_eq!(Card::new(0).unwrap().rank(), 0);
        assert_eq!(Card::new(3).unwrap().rank(), 0);
        assert_eq!(Card::new(4).unwrap().rank(), 1);
        assert_eq!(Card::new(51).unwrap().rank(), RANK_TWO);
        assert_eq!(Card::BLACK_JOKER.rank(), RANK_BLACK_JOKER);
        assert_eq!(Card::RED_JOKER.rank(), RANK_RED_JOKER);
    }

    #[test]
    fn test_card_suits() {
        assert_eq!(Card::new(0).unwrap().suit(), Suit::Spade);
        assert_eq!(Card::new(7).unwrap().suit(), Suit::Diamond);
        assert_eq!(Card::RED_JOKER.suit(), Suit::Joker);
        assert!(Card::BLACK_JOKER.is_joker());
        assert!(!Card::new(51).unwrap().is_joker());
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(0).unwrap().to_string(), "3♠");
        assert_eq!(Card::new(45).unwrap().to_string(), "A♥");
        assert_eq!(Card::RED_JOKER.to_string(), "RJ");
    }

    #[test]
    fn test_card_serializes_as_id() {
        let json = serde_json::to_string(&Card::new(17).unwrap()).unwrap();
        assert_eq!(json, "17");
    }

    // === Deck Tests ===

    #[test]
    fn test_deck_has_every_card_once() {
        let mut deck = Deck::default();
        deck.shuffle();
        let unique: HashSet<_> = deck.cards().iter().copied().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }

    #[test]
    fn test_deck_deal_sizes() {
        let mut deck = Deck::default();
        deck.shuffle();
        let (hands, kitty) = deck.deal();
        for hand in &hands {
            assert_eq!(hand.len(), HAND_SIZE);
            assert!(hand.windows(2).all(|w| w[0] <= w[1]));
        }
        assert_eq!(kitty.len(), KITTY_SIZE);

        let mut all: Vec<Card> = hands.concat();
        all.extend(kitty);
        let unique: HashSet<_> = all.into_iter().collect();
        assert_eq!(unique.len(), DECK_SIZE);
    }
}
