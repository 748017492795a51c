//! Hand ordering and trump classification.

use log::debug;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::entities::{Card, ContractType, Rank, Suit};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Suit first, then rank.
    #[default]
    Suit,
    /// Rank first, then suit.
    Rank,
    /// Obers, Unters and Herz first, then everything else.
    Trump,
    /// Last captured order.
    Custom,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown sort mode '{0}' (expected suit, rank, trump or custom)")]
pub struct UnknownSortMode(pub String);

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Suit => write!(f, "suit"),
            SortMode::Rank => write!(f, "rank"),
            SortMode::Trump => write!(f, "trump"),
            SortMode::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "suit" => Ok(SortMode::Suit),
            "rank" => Ok(SortMode::Rank),
            "trump" => Ok(SortMode::Trump),
            "custom" => Ok(SortMode::Custom),
            _ => Err(UnknownSortMode(s.to_string())),
        }
    }
}

/// Display heuristic used by [`SortMode::Trump`]. This is the Rufer trump
/// set; it does not follow the actual contract.
pub fn is_display_trump(card: &Card) -> bool {
    matches!(card.rank, Rank::Ober | Rank::Unter) || card.suit == Suit::Herz
}

/// Whether `card` is trump under the given contract, as the server rules it.
///
/// Rufer: Obers, Unters and Herz. Wenz (suited or not): Unters only.
/// Solo: Obers, Unters and the chosen suit.
pub fn is_trump(card: &Card, contract_type: ContractType, trump_suit: Option<Suit>) -> bool {
    match contract_type {
        ContractType::Rufer => is_display_trump(card),
        ContractType::Wenz => card.rank == Rank::Unter,
        ContractType::Solo => {
            matches!(card.rank, Rank::Ober | Rank::Unter) || Some(card.suit) == trump_suit
        }
    }
}

/// Orders hands for display. The only state kept between calls is the
/// custom order captured with [`HandSorter::capture_custom`].
#[derive(Clone, Debug, Default)]
pub struct HandSorter {
    custom_order: Option<Vec<Card>>,
}

impl HandSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers `hand` exactly as given for [`SortMode::Custom`].
    pub fn capture_custom(&mut self, hand: &[Card]) {
        self.custom_order = Some(hand.to_vec());
    }

    pub fn has_custom_order(&self) -> bool {
        self.custom_order.is_some()
    }

    /// Returns `hand` ordered by `mode`. All sorts are stable.
    pub fn sort(&self, hand: &[Card], mode: SortMode) -> Vec<Card> {
        let mut sorted = hand.to_vec();
        match mode {
            SortMode::Suit => sorted.sort_by_key(|c| (c.suit.precedence(), c.rank.precedence())),
            SortMode::Rank => sorted.sort_by_key(|c| (c.rank.precedence(), c.suit.precedence())),
            SortMode::Trump => sorted.sort_by_key(|c| (!is_display_trump(c), c.suit.precedence())),
            SortMode::Custom => match &self.custom_order {
                Some(order) => {
                    if order.len() != hand.len() || !hand.iter().all(|c| order.contains(c)) {
                        debug!("custom order was captured from a different hand");
                    }
                    return order.clone();
                }
                None => return self.sort(hand, SortMode::Suit),
            },
        }
        sorted
    }
}
