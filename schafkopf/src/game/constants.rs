/// Players at a Schafkopf table.
pub const NUM_SEATS: usize = 4;

/// Cards dealt to each player.
pub const HAND_SIZE: usize = 8;

/// Tricks in one round.
pub const TRICKS_PER_ROUND: usize = 8;

/// Total card points in the 32-card deck.
pub const POINTS_PER_DECK: u32 = 120;

/// Consecutive passes after which the server ends the bidding round.
pub const MAX_PASSES_IN_A_ROW: u8 = 3;
