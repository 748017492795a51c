use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::constants::NUM_SEATS;

/// A table position. Seats are stable for a whole match and always `< 4`.
pub type Seat = usize;

/// Errors produced when parsing cards or contracts from text.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("unknown suit '{0}' (expected eichel, gras, herz or schellen)")]
    Suit(String),
    #[error("unknown rank '{0}' (expected ace, ten, king, ober, unter, nine, eight or seven)")]
    Rank(String),
    #[error("unknown contract '{0}' (expected rufer, wenz or solo)")]
    Contract(String),
    #[error("expected '<suit> <rank>', got '{0}'")]
    Card(String),
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Eichel,
    Gras,
    Herz,
    Schellen,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Eichel, Suit::Gras, Suit::Herz, Suit::Schellen];

    /// Canonical display precedence, lower sorts first.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Eichel => 0,
            Self::Gras => 1,
            Self::Herz => 2,
            Self::Schellen => 3,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Eichel => "Eichel",
            Self::Gras => "Gras",
            Self::Herz => "Herz",
            Self::Schellen => "Schellen",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Suit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eichel" | "e" => Ok(Self::Eichel),
            "gras" | "g" => Ok(Self::Gras),
            "herz" | "h" => Ok(Self::Herz),
            "schellen" | "s" => Ok(Self::Schellen),
            _ => Err(ParseError::Suit(s.to_string())),
        }
    }
}

/// Card ranks, declared in display precedence order (Ace first, Seven last).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Ace,
    Ten,
    King,
    Ober,
    Unter,
    Nine,
    Eight,
    Seven,
}

impl Rank {
    pub const ALL: [Rank; 8] = [
        Rank::Ace,
        Rank::Ten,
        Rank::King,
        Rank::Ober,
        Rank::Unter,
        Rank::Nine,
        Rank::Eight,
        Rank::Seven,
    ];

    /// Canonical display precedence, lower sorts first.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Ace => 0,
            Self::Ten => 1,
            Self::King => 2,
            Self::Ober => 3,
            Self::Unter => 4,
            Self::Nine => 5,
            Self::Eight => 6,
            Self::Seven => 7,
        }
    }

    /// Card points counted towards the 120 in a deck.
    pub fn points(self) -> u8 {
        match self {
            Self::Ace => 11,
            Self::Ten => 10,
            Self::King => 4,
            Self::Ober => 3,
            Self::Unter => 2,
            Self::Nine | Self::Eight | Self::Seven => 0,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Ace => "Ace",
            Self::Ten => "Ten",
            Self::King => "King",
            Self::Ober => "Ober",
            Self::Unter => "Unter",
            Self::Nine => "Nine",
            Self::Eight => "Eight",
            Self::Seven => "Seven",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Rank {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ace" | "a" | "sau" => Ok(Self::Ace),
            "ten" | "10" => Ok(Self::Ten),
            "king" | "k" => Ok(Self::King),
            "ober" | "o" => Ok(Self::Ober),
            "unter" | "u" => Ok(Self::Unter),
            "nine" | "9" => Ok(Self::Nine),
            "eight" | "8" => Ok(Self::Eight),
            "seven" | "7" => Ok(Self::Seven),
            _ => Err(ParseError::Rank(s.to_string())),
        }
    }
}

/// Card as it appears on the wire. `value` is informational; the point
/// value is always recomputed from the rank.
#[derive(Deserialize)]
struct WireCard {
    suit: Suit,
    rank: Rank,
    #[allow(dead_code)]
    value: Option<u8>,
}

impl From<WireCard> for Card {
    fn from(wire: WireCard) -> Self {
        Card::new(wire.suit, wire.rank)
    }
}

/// An immutable playing card from the 32-card Bavarian deck.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(from = "WireCard")]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    value: u8,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self {
            suit,
            rank,
            value: rank.points(),
        }
    }

    pub fn points(&self) -> u8 {
        self.value
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.suit, self.rank)
    }
}

impl FromStr for Card {
    type Err = ParseError;

    /// Parses `"<suit> <rank>"`, e.g. `"herz ace"` or `"h a"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [suit, rank] => Ok(Card::new(suit.parse()?, rank.parse()?)),
            _ => Err(ParseError::Card(s.to_string())),
        }
    }
}

/// Every card of the deck, in canonical suit-then-rank order.
pub fn full_deck() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(suit, rank)))
        .collect()
}

/// Sum of card points, e.g. for a trick or a hand.
pub fn points(cards: &[Card]) -> u32 {
    cards.iter().map(|c| u32::from(c.points())).sum()
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ContractType {
    Rufer,
    Wenz,
    Solo,
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Rufer => "Rufer",
            Self::Wenz => "Wenz",
            Self::Solo => "Solo",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for ContractType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rufer" | "sauspiel" => Ok(Self::Rufer),
            "wenz" => Ok(Self::Wenz),
            "solo" => Ok(Self::Solo),
            _ => Err(ParseError::Contract(s.to_string())),
        }
    }
}

/// One proposed contract, as reported by the server in `highest_bid`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Bid {
    pub contract_type: ContractType,
    #[serde(default)]
    pub trump_suit: Option<Suit>,
    #[serde(default)]
    pub called_ace: Option<Suit>,
    #[serde(rename = "bidder_index")]
    pub bidder_seat: Seat,
}

impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.contract_type)?;
        if let Some(suit) = self.trump_suit {
            write!(f, " {suit}")?;
        }
        if let Some(ace) = self.called_ace {
            write!(f, " (calls {ace} Ace)")?;
        }
        Ok(())
    }
}

/// Seat that sits `offset` positions clockwise from `seat`.
pub fn seat_after(seat: Seat, offset: usize) -> Seat {
    (seat + offset) % NUM_SEATS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::POINTS_PER_DECK;

    #[test]
    fn test_card_points_follow_rank() {
        assert_eq!(Card::new(Suit::Herz, Rank::Ace).points(), 11);
        assert_eq!(Card::new(Suit::Gras, Rank::Ten).points(), 10);
        assert_eq!(Card::new(Suit::Eichel, Rank::Ober).points(), 3);
        assert_eq!(Card::new(Suit::Schellen, Rank::Seven).points(), 0);
    }

    #[test]
    fn test_full_deck_has_32_cards_and_120_points() {
        let deck = full_deck();
        assert_eq!(deck.len(), 32);
        assert_eq!(points(&deck), POINTS_PER_DECK);

        let unique: std::collections::HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), 32);
    }

    #[test]
    fn test_card_deserializes_with_and_without_value() {
        let with: Card = serde_json::from_str(r#"{"suit":"Herz","rank":"King","value":4}"#).unwrap();
        let without: Card = serde_json::from_str(r#"{"suit":"Herz","rank":"King"}"#).unwrap();
        assert_eq!(with, without);
        assert_eq!(with.points(), 4);
    }

    #[test]
    fn test_card_value_is_recomputed_from_rank() {
        let card: Card = serde_json::from_str(r#"{"suit":"Gras","rank":"Ace","value":0}"#).unwrap();
        assert_eq!(card.points(), 11);
    }

    #[test]
    fn test_card_serializes_wire_shape() {
        let json = serde_json::to_value(Card::new(Suit::Schellen, Rank::Unter)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"suit": "Schellen", "rank": "Unter", "value": 2})
        );
    }

    #[test]
    fn test_parse_card() {
        assert_eq!("herz ace".parse(), Ok(Card::new(Suit::Herz, Rank::Ace)));
        assert_eq!("E 10".parse(), Ok(Card::new(Suit::Eichel, Rank::Ten)));
        assert_eq!(
            "herz".parse::<Card>(),
            Err(ParseError::Card("herz".to_string()))
        );
        assert!(matches!("blatt ace".parse::<Card>(), Err(ParseError::Suit(_))));
        assert!(matches!("gras jack".parse::<Card>(), Err(ParseError::Rank(_))));
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(Suit::Gras, Rank::Ober).to_string(), "Gras Ober");
    }

    #[test]
    fn test_bid_wire_shape() {
        let bid: Bid = serde_json::from_str(
            r#"{"contract_type":"Solo","trump_suit":"Gras","called_ace":null,"bidder_index":3}"#,
        )
        .unwrap();
        assert_eq!(bid.contract_type, ContractType::Solo);
        assert_eq!(bid.trump_suit, Some(Suit::Gras));
        assert_eq!(bid.called_ace, None);
        assert_eq!(bid.bidder_seat, 3);
        assert_eq!(bid.to_string(), "Solo Gras");
    }

    #[test]
    fn test_seat_after_wraps() {
        assert_eq!(seat_after(0, 1), 1);
        assert_eq!(seat_after(3, 1), 0);
        assert_eq!(seat_after(2, 3), 1);
    }
}
