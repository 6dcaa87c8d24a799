//! Card legality engine.
//!
//! Pure functions that classify a set of cards into a combination, decide
//! whether a proposed play beats the previous one, and suggest a legal
//! response for robots.

use std::fmt;

use super::constants::{MIN_AIRPLANE_LEN, MIN_PAIR_STRAIGHT_LEN, MIN_STRAIGHT_LEN};
use super::entities::{Card, RANK_ACE, RANK_RED_JOKER, RANK_TWO, Rank};

const RANK_COUNT: usize = RANK_RED_JOKER as usize + 1;

/// Result of comparing a proposed play against the last one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outrank {
    /// The play is a recognised combination that beats the last play.
    Beats,
    /// Same kind of combination, but not higher.
    DoesNotBeat,
    /// Not a recognised combination, or not comparable with the last play.
    Invalid,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    Single,
    Pair,
    Triple,
    TripleWithSingle,
    TripleWithPair,
    Straight,
    PairStraight,
    Airplane,
    AirplaneWithSingles,
    AirplaneWithPairs,
    FourWithSingles,
    FourWithPairs,
    Bomb,
    Rocket,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Single => "single",
            Self::Pair => "pair",
            Self::Triple => "triple",
            Self::TripleWithSingle => "triple+1",
            Self::TripleWithPair => "triple+2",
            Self::Straight => "straight",
            Self::PairStraight => "pair straight",
            Self::Airplane => "airplane",
            Self::AirplaneWithSingles => "airplane+singles",
            Self::AirplaneWithPairs => "airplane+pairs",
            Self::FourWithSingles => "four+2",
            Self::FourWithPairs => "four+2 pairs",
            Self::Bomb => "bomb",
            Self::Rocket => "rocket",
        };
        write!(f, "{repr}")
    }
}

/// A classified play.
///
/// `key` is the rank that decides comparisons (the highest rank of a
/// chain, the rank of the triple or four). `len` is the number of links
/// in a chain and 1 for everything else.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Combination {
    pub kind: Kind,
    pub key: Rank,
    pub len: usize,
}

impl Combination {
    fn new(kind: Kind, key: Rank, len: usize) -> Self {
        Self { kind, key, len }
    }

    /// Bombs and rockets double the table's stake.
    pub fn doubles_stake(&self) -> bool {
        matches!(self.kind, Kind::Bomb | Kind::Rocket)
    }

    pub fn outranks(&self, last: &Combination) -> Outrank {
        use Kind::{Bomb, Rocket};

        match (self.kind, last.kind) {
            (Rocket, Rocket) => Outrank::DoesNotBeat,
            (Rocket, _) => Outrank::Beats,
            (_, Rocket) => Outrank::DoesNotBeat,
            (Bomb, Bomb) => higher(self.key, last.key),
            (Bomb, _) => Outrank::Beats,
            (_, Bomb) => Outrank::DoesNotBeat,
            (kind, last_kind) if kind == last_kind && self.len == last.len => {
                higher(self.key, last.key)
            }
            _ => Outrank::Invalid,
        }
    }
}

fn higher(key: Rank, last_key: Rank) -> Outrank {
    if key > last_key {
        Outrank::Beats
    } else {
        Outrank::DoesNotBeat
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len > 1 {
            write!(f, "{}x{}@{}", self.kind, self.len, self.key)
        } else {
            write!(f, "{}@{}", self.kind, self.key)
        }
    }
}

/// Cards of a hand grouped by rank.
struct RankIndex {
    by_rank: [Vec<Card>; RANK_COUNT],
}

impl RankIndex {
    fn new(cards: &[Card]) -> Self {
        let mut by_rank: [Vec<Card>; RANK_COUNT] = Default::default();
        for &card in cards {
            by_rank[usize::from(card.rank())].push(card);
        }
        for group in &mut by_rank {
            group.sort_unstable();
        }
        Self { by_rank }
    }

    fn count(&self, rank: Rank) -> usize {
        self.by_rank[usize::from(rank)].len()
    }

    fn take(&self, rank: Rank, n: usize) -> &[Card] {
        &self.by_rank[usize::from(rank)][..n]
    }

    fn ranks_with(&self, n: usize) -> impl Iterator<Item = Rank> + '_ {
        (0..RANK_COUNT as Rank).filter(move |&r| self.count(r) == n)
    }

    /// Whether `len` consecutive ranks ending at `top` all hold at least
    /// `width` cards. Chains never include the two or the jokers.
    fn has_chain(&self, top: Rank, len: usize, width: usize) -> bool {
        top <= RANK_ACE
            && usize::from(top) + 1 >= len
            && (0..len).all(|i| self.count(top - i as Rank) >= width)
    }
}

/// Classifies a set of cards, or returns `None` when it is not a
/// recognised combination.
pub fn classify(cards: &[Card]) -> Option<Combination> {
    let n = cards.len();
    if n == 0 {
        return None;
    }
    let index = RankIndex::new(cards);
    let fours: Vec<Rank> = index.ranks_with(4).collect();
    let triples: Vec<Rank> = index.ranks_with(3).collect();
    let pairs: Vec<Rank> = index.ranks_with(2).collect();
    let singles: Vec<Rank> = index.ranks_with(1).collect();

    let combination = match n {
        1 => Some(Combination::new(Kind::Single, singles[0], 1)),
        2 if cards.iter().all(|c| c.is_joker()) => {
            Some(Combination::new(Kind::Rocket, RANK_RED_JOKER, 1))
        }
        2 if pairs.len() == 1 => Some(Combination::new(Kind::Pair, pairs[0], 1)),
        3 if triples.len() == 1 => Some(Combination::new(Kind::Triple, triples[0], 1)),
        4 if fours.len() == 1 => Some(Combination::new(Kind::Bomb, fours[0], 1)),
        4 if triples.len() == 1 => Some(Combination::new(Kind::TripleWithSingle, triples[0], 1)),
        5 if triples.len() == 1 && pairs.len() == 1 => {
            Some(Combination::new(Kind::TripleWithPair, triples[0], 1))
        }
        // The two kickers may be a pair or the jokers.
        6 if fours.len() == 1 => Some(Combination::new(Kind::FourWithSingles, fours[0], 1)),
        8 if fours.len() == 1 && pairs.len() == 2 => {
            Some(Combination::new(Kind::FourWithPairs, fours[0], 1))
        }
        _ => None,
    };
    combination
        .or_else(|| classify_chain(&index, n, singles.len(), pairs.len()))
}

fn classify_chain(
    index: &RankIndex,
    n: usize,
    singles: usize,
    pairs: usize,
) -> Option<Combination> {
    let top = || (0..=RANK_ACE).rev().find(|&r| index.count(r) > 0);

    if n >= MIN_STRAIGHT_LEN && singles == n {
        let top = top()?;
        if index.has_chain(top, n, 1) {
            return Some(Combination::new(Kind::Straight, top, n));
        }
    }
    if n >= 2 * MIN_PAIR_STRAIGHT_LEN && n % 2 == 0 && pairs * 2 == n {
        let top = top()?;
        if index.has_chain(top, n / 2, 2) {
            return Some(Combination::new(Kind::PairStraight, top, n / 2));
        }
    }
    if n >= 3 * MIN_AIRPLANE_LEN {
        return classify_airplane(index, n);
    }
    None
}

/// Airplanes: a run of consecutive triples, bare or with one single or
/// one pair per triple as wings. Longer runs are tried first so twelve
/// cards of four consecutive triples classify as a bare airplane. Single
/// wings need not differ, and may share a rank with the run, so
/// `33334444` is a two-triple airplane with two single wings.
fn classify_airplane(index: &RankIndex, n: usize) -> Option<Combination> {
    for len in (MIN_AIRPLANE_LEN..=n / 3).rev() {
        for top in (0..=RANK_ACE).rev() {
            if !index.has_chain(top, len, 3) {
                continue;
            }
            let rest = n - 3 * len;
            let run = |r: Rank| r <= top && r + len as Rank > top;
            if rest == 0 {
                return Some(Combination::new(Kind::Airplane, top, len));
            }
            if rest == len {
                return Some(Combination::new(Kind::AirplaneWithSingles, top, len));
            }
            if rest == 2 * len {
                let wings_paired = (0..RANK_COUNT as Rank).all(|r| {
                    let left = if run(r) {
                        index.count(r) - 3
                    } else {
                        index.count(r)
                    };
                    left % 2 == 0
                });
                if wings_paired {
                    return Some(Combination::new(Kind::AirplaneWithPairs, top, len));
                }
            }
        }
    }
    None
}

/// Decides whether `proposed` may follow `last`, and whether it doubles
/// the stake.
///
/// An empty `last` is an opening: any recognised combination is accepted.
pub fn compare_against_last(last: &[Card], proposed: &[Card]) -> (Outrank, bool) {
    let Some(play) = classify(proposed) else {
        return (Outrank::Invalid, false);
    };
    let doubles = play.doubles_stake();
    if last.is_empty() {
        return (Outrank::Beats, doubles);
    }
    match classify(last) {
        Some(previous) => (play.outranks(&previous), doubles),
        None => (Outrank::Invalid, doubles),
    }
}

/// Suggests a play from `hand` that beats `last`.
///
/// The search runs when the iterator is first polled and yields the
/// suggestion once. When leading it suggests the lowest single; when
/// nothing in the hand beats `last` it falls back to the lowest card,
/// which the table rejects like a pass.
pub fn legal_subset_above<'a>(
    hand: &'a [Card],
    last: &'a [Card],
) -> impl Iterator<Item = Card> + 'a {
    std::iter::once_with(move || find_response(hand, last)).flatten()
}

fn find_response(hand: &[Card], last: &[Card]) -> Vec<Card> {
    let Some(&lowest) = hand.iter().min() else {
        return Vec::new();
    };
    if last.is_empty() {
        return vec![lowest];
    }
    let Some(previous) = classify(last) else {
        return vec![lowest];
    };
    let index = RankIndex::new(hand);

    let candidate = match previous.kind {
        Kind::Rocket => None,
        Kind::Bomb => bomb_above(&index, Some(previous.key)).or_else(|| rocket(&index)),
        _ => same_kind_above(&index, &previous)
            .or_else(|| bomb_above(&index, None))
            .or_else(|| rocket(&index)),
    };

    match candidate {
        Some(cards) if compare_against_last(last, &cards).0 == Outrank::Beats => cards,
        _ => vec![lowest],
    }
}

fn rocket(index: &RankIndex) -> Option<Vec<Card>> {
    (index.count(RANK_RED_JOKER) == 1 && index.count(RANK_RED_JOKER - 1) == 1)
        .then(|| vec![Card::BLACK_JOKER, Card::RED_JOKER])
}

fn bomb_above(index: &RankIndex, above: Option<Rank>) -> Option<Vec<Card>> {
    let start = above.map_or(0, |r| r + 1);
    (start..=RANK_TWO)
        .find(|&r| index.count(r) == 4)
        .map(|r| index.take(r, 4).to_vec())
}

/// Lowest rank above `key` holding at least `width` cards.
fn group_above(index: &RankIndex, key: Option<Rank>, width: usize) -> Option<Rank> {
    let start = key.map_or(0, |r| r + 1);
    (start..RANK_COUNT as Rank).find(|&r| index.count(r) >= width)
}

/// Lowest `count` kicker groups of `width` cards, one per rank, outside
/// the ranks in `used`.
fn kickers(index: &RankIndex, used: &[Rank], width: usize, count: usize) -> Option<Vec<Card>> {
    let ranks: Vec<Rank> = (0..RANK_COUNT as Rank)
        .filter(|r| !used.contains(r) && index.count(*r) >= width)
        .take(count)
        .collect();
    (ranks.len() == count).then(|| {
        ranks
            .into_iter()
            .flat_map(|r| index.take(r, width).iter().copied())
            .collect()
    })
}

fn chain_above(index: &RankIndex, previous: &Combination, width: usize) -> Option<Vec<Rank>> {
    let len = previous.len;
    ((previous.key + 1)..=RANK_ACE)
        .find(|&top| index.has_chain(top, len, width))
        .map(|top| (0..len).map(|i| top - i as Rank).collect())
}

fn same_kind_above(index: &RankIndex, previous: &Combination) -> Option<Vec<Card>> {
    let key = Some(previous.key);
    let with = |ranks: &[Rank], width: usize, extra: Option<Vec<Card>>| -> Option<Vec<Card>> {
        let mut cards: Vec<Card> = ranks
            .iter()
            .flat_map(|&r| index.take(r, width).iter().copied())
            .collect();
        cards.extend(extra?);
        Some(cards)
    };

    match previous.kind {
        Kind::Single => group_above(index, key, 1).map(|r| index.take(r, 1).to_vec()),
        Kind::Pair => group_above(index, key, 2).map(|r| index.take(r, 2).to_vec()),
        Kind::Triple => group_above(index, key, 3).map(|r| index.take(r, 3).to_vec()),
        Kind::TripleWithSingle => {
            let r = group_above(index, key, 3)?;
            with(&[r], 3, kickers(index, &[r], 1, 1))
        }
        Kind::TripleWithPair => {
            let r = group_above(index, key, 3)?;
            with(&[r], 3, kickers(index, &[r], 2, 1))
        }
        Kind::FourWithSingles => {
            let r = (previous.key + 1..RANK_COUNT as Rank).find(|&r| index.count(r) == 4)?;
            with(&[r], 4, kickers(index, &[r], 1, 2))
        }
        Kind::FourWithPairs => {
            let r = (previous.key + 1..RANK_COUNT as Rank).find(|&r| index.count(r) == 4)?;
            with(&[r], 4, kickers(index, &[r], 2, 2))
        }
        Kind::Straight => chain_above(index, previous, 1).and_then(|run| with(&run, 1, Some(vec![]))),
        Kind::PairStraight => {
            chain_above(index, previous, 2).and_then(|run| with(&run, 2, Some(vec![])))
        }
        Kind::Airplane => chain_above(index, previous, 3).and_then(|run| with(&run, 3, Some(vec![]))),
        Kind::AirplaneWithSingles => {
            let run = chain_above(index, previous, 3)?;
            with(&run, 3, kickers(index, &run, 1, previous.len))
        }
        Kind::AirplaneWithPairs => {
            let run = chain_above(index, previous, 3)?;
            with(&run, 3, kickers(index, &run, 2, previous.len))
        }
        Kind::Bomb | Kind::Rocket => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds cards from ranks, picking suits in order so repeated ranks
    /// stay distinct.
    fn cards(ranks: &[Rank]) -> Vec<Card> {
        let mut used = [0u8; RANK_COUNT];
        ranks
            .iter()
            .map(|&r| match r {
                13 => Card::BLACK_JOKER,
                14 => Card::RED_JOKER,
                r => {
                    let suit = used[usize::from(r)];
                    used[usize::from(r)] += 1;
                    Card::new(r * 4 + suit).unwrap()
                }
            })
            .collect()
    }

    fn kind_of(ranks: &[Rank]) -> Option<Kind> {
        classify(&cards(ranks)).map(|c| c.kind)
    }

    // === Classification Tests ===

    #[test]
    fn test_classify_basic_shapes() {
        assert_eq!(kind_of(&[5]), Some(Kind::Single));
        assert_eq!(kind_of(&[5, 5]), Some(Kind::Pair));
        assert_eq!(kind_of(&[5, 5, 5]), Some(Kind::Triple));
        assert_eq!(kind_of(&[5, 5, 5, 9]), Some(Kind::TripleWithSingle));
        assert_eq!(kind_of(&[5, 5, 5, 9, 9]), Some(Kind::TripleWithPair));
        assert_eq!(kind_of(&[5, 5, 5, 5]), Some(Kind::Bomb));
        assert_eq!(kind_of(&[13, 14]), Some(Kind::Rocket));
    }

    #[test]
    fn test_classify_rejects_loose_cards() {
        assert_eq!(kind_of(&[]), None);
        assert_eq!(kind_of(&[5, 6]), None);
        assert_eq!(kind_of(&[5, 5, 6]), None);
        assert_eq!(kind_of(&[5, 5, 6, 6]), None);
    }

    #[test]
    fn test_classify_straights() {
        assert_eq!(kind_of(&[0, 1, 2, 3, 4]), Some(Kind::Straight));
        assert_eq!(kind_of(&[7, 8, 9, 10, 11]), Some(Kind::Straight));
        // The two never joins a straight.
        assert_eq!(kind_of(&[8, 9, 10, 11, 12]), None);
        assert_eq!(kind_of(&[0, 1, 2, 3]), None);
        assert_eq!(kind_of(&[0, 1, 2, 3, 5]), None);
    }

    #[test]
    fn test_classify_pair_straight() {
        let combo = classify(&cards(&[3, 3, 4, 4, 5, 5])).unwrap();
        assert_eq!(combo.kind, Kind::PairStraight);
        assert_eq!(combo.len, 3);
        assert_eq!(combo.key, 5);
        assert_eq!(kind_of(&[3, 3, 4, 4]), None);
    }

    #[test]
    fn test_classify_airplanes() {
        assert_eq!(kind_of(&[3, 3, 3, 4, 4, 4]), Some(Kind::Airplane));
        assert_eq!(
            kind_of(&[3, 3, 3, 4, 4, 4, 0, 9]),
            Some(Kind::AirplaneWithSingles)
        );
        assert_eq!(
            kind_of(&[3, 3, 3, 4, 4, 4, 0, 0, 9, 9]),
            Some(Kind::AirplaneWithPairs)
        );
        assert_eq!(kind_of(&[3, 3, 3, 5, 5, 5]), None);
    }

    #[test]
    fn test_classify_four_with_kickers() {
        assert_eq!(kind_of(&[6, 6, 6, 6, 0, 1]), Some(Kind::FourWithSingles));
        assert_eq!(
            kind_of(&[6, 6, 6, 6, 0, 0, 1, 1]),
            Some(Kind::FourWithPairs)
        );
        assert_eq!(kind_of(&[6, 6, 6, 6, 0, 0]), Some(Kind::FourWithSingles));
        assert_eq!(kind_of(&[6, 6, 6, 6, 13, 14]), Some(Kind::FourWithSingles));
    }

    #[test]
    fn test_classify_airplane_wings_from_the_run() {
        let combo = classify(&cards(&[0, 0, 0, 0, 1, 1, 1, 1])).unwrap();
        assert_eq!(combo.kind, Kind::AirplaneWithSingles);
        assert_eq!(combo.key, 1);
        assert_eq!(combo.len, 2);
    }

    // === Comparison Tests ===

    #[test]
    fn test_opening_play_beats_nothing() {
        assert_eq!(compare_against_last(&[], &cards(&[0])), (Outrank::Beats, false));
        assert_eq!(
            compare_against_last(&[], &cards(&[0, 0, 0, 0])),
            (Outrank::Beats, true)
        );
    }

    #[test]
    fn test_opening_play_must_be_a_combination() {
        assert_eq!(
            compare_against_last(&[], &cards(&[0, 4])).0,
            Outrank::Invalid
        );
    }

    #[test]
    fn test_higher_single_beats_lower() {
        let last = cards(&[7]);
        assert_eq!(compare_against_last(&last, &cards(&[8])).0, Outrank::Beats);
        assert_eq!(
            compare_against_last(&last, &cards(&[7])).0,
            Outrank::DoesNotBeat
        );
        assert_eq!(
            compare_against_last(&last, &cards(&[2])).0,
            Outrank::DoesNotBeat
        );
    }

    #[test]
    fn test_mismatched_shapes_are_incomparable() {
        let last = cards(&[7]);
        assert_eq!(
            compare_against_last(&last, &cards(&[9, 9])).0,
            Outrank::Invalid
        );
        let straight = cards(&[0, 1, 2, 3, 4]);
        assert_eq!(
            compare_against_last(&straight, &cards(&[1, 2, 3, 4, 5, 6])).0,
            Outrank::Invalid
        );
    }

    #[test]
    fn test_bomb_beats_anything_but_rocket() {
        let bomb = cards(&[0, 0, 0, 0]);
        assert_eq!(
            compare_against_last(&cards(&[12, 12, 12, 9]), &bomb),
            (Outrank::Beats, true)
        );
        assert_eq!(
            compare_against_last(&cards(&[1, 1, 1, 1]), &bomb),
            (Outrank::DoesNotBeat, true)
        );
        assert_eq!(
            compare_against_last(&cards(&[13, 14]), &bomb),
            (Outrank::DoesNotBeat, true)
        );
    }

    #[test]
    fn test_rocket_beats_bomb() {
        assert_eq!(
            compare_against_last(&cards(&[12, 12, 12, 12]), &cards(&[13, 14])),
            (Outrank::Beats, true)
        );
    }

    #[test]
    fn test_equal_length_straights_compare_by_top() {
        let last = cards(&[0, 1, 2, 3, 4]);
        assert_eq!(
            compare_against_last(&last, &cards(&[1, 2, 3, 4, 5])).0,
            Outrank::Beats
        );
    }

    // === Suggestion Tests ===

    #[test]
    fn test_suggestion_when_leading_is_lowest_single() {
        let hand = cards(&[9, 3, 3, 12]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &[]).collect();
        assert_eq!(suggestion, cards(&[3]));
    }

    #[test]
    fn test_suggestion_beats_single() {
        let hand = cards(&[2, 5, 9, 12]);
        let last = cards(&[6]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &last).collect();
        assert_eq!(suggestion, cards(&[9]));
    }

    #[test]
    fn test_suggestion_triple_with_pair() {
        let hand = cards(&[1, 1, 8, 8, 8, 10]);
        let last = cards(&[4, 4, 4, 0, 0]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &last).collect();
        assert_eq!(compare_against_last(&last, &suggestion).0, Outrank::Beats);
        assert_eq!(suggestion.len(), 5);
    }

    #[test]
    fn test_suggestion_uses_bomb_when_nothing_else_beats() {
        let hand = cards(&[0, 2, 2, 2, 2]);
        let last = cards(&[12]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &last).collect();
        assert_eq!(classify(&suggestion).unwrap().kind, Kind::Bomb);
    }

    #[test]
    fn test_suggestion_falls_back_to_lowest_card() {
        let hand = cards(&[0, 1, 2]);
        let last = cards(&[12]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &last).collect();
        assert_eq!(suggestion, cards(&[0]));
        assert_ne!(compare_against_last(&last, &suggestion).0, Outrank::Beats);
    }

    #[test]
    fn test_suggestion_straight_above() {
        let hand = cards(&[2, 3, 4, 5, 6, 7, 11]);
        let last = cards(&[1, 2, 3, 4, 5]);
        let suggestion: Vec<Card> = legal_subset_above(&hand, &last).collect();
        let combo = classify(&suggestion).unwrap();
        assert_eq!(combo.kind, Kind::Straight);
        assert_eq!(combo.key, 6);
    }

    #[test]
    fn test_suggestion_from_empty_hand_is_empty() {
        assert_eq!(legal_subset_above(&[], &cards(&[3])).count(), 0);
    }
}
