//! Fixed game parameters.

/// Seats at a landlord table.
pub const MAX_PLAYERS: usize = 3;

/// Cards in a full deck, jokers included.
pub const DECK_SIZE: usize = 54;

/// Cards held back for the landlord.
pub const KITTY_SIZE: usize = 3;

/// Cards dealt to each player before the kitty is handed out.
pub const HAND_SIZE: usize = (DECK_SIZE - KITTY_SIZE) / MAX_PLAYERS;

/// Largest hand a player can hold (the landlord's after the kitty).
pub const MAX_HAND_SIZE: usize = HAND_SIZE + KITTY_SIZE;

/// Highest bid. Bidding it ends the round immediately.
pub const MAX_BID: u8 = 3;

/// Shortest run of consecutive singles that counts as a straight.
pub const MIN_STRAIGHT_LEN: usize = 5;

/// Shortest run of consecutive pairs that counts as a pair straight.
pub const MIN_PAIR_STRAIGHT_LEN: usize = 3;

/// Shortest run of consecutive triples that counts as an airplane.
pub const MIN_AIRPLANE_LEN: usize = 2;

/// Chat messages longer than this are truncated.
pub const MAX_CHAT_LENGTH: usize = 128;
