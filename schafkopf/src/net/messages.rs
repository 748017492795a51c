use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::errors::{ProtocolError, Result};
use crate::game::{
    bidding::ContractBid,
    entities::{Bid, Card, ContractType, Rank, Seat, Suit},
};

/// A card reference as sent with `play_card`. Carries no point value.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CardRef {
    pub suit: Suit,
    pub rank: Rank,
}

impl From<Card> for CardRef {
    fn from(card: Card) -> Self {
        Self {
            suit: card.suit,
            rank: card.rank,
        }
    }
}

/// A message from the client to the game server.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the server for a full snapshot.
    GetState,
    PlayCard {
        card: CardRef,
    },
    Pass,
    SelectContract {
        contract: ContractType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trump_suit: Option<Suit>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        called_ace: Option<Suit>,
    },
}

impl ClientMessage {
    pub fn play_card(card: Card) -> Self {
        Self::PlayCard { card: card.into() }
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl From<ContractBid> for ClientMessage {
    fn from(bid: ContractBid) -> Self {
        Self::SelectContract {
            contract: bid.contract_type,
            trump_suit: bid.trump_suit,
            called_ace: bid.called_ace,
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::GetState => write!(f, "requested the game state"),
            Self::PlayCard { card } => write!(f, "played {} {}", card.suit, card.rank),
            Self::Pass => write!(f, "passed"),
            Self::SelectContract {
                contract,
                trump_suit,
                called_ace,
            } => {
                write!(f, "bid {contract}")?;
                if let Some(suit) = trump_suit {
                    write!(f, " {suit}")?;
                }
                if let Some(ace) = called_ace {
                    write!(f, " calling the {ace} Ace")?;
                }
                Ok(())
            }
        }
    }
}

/// The `state` payload of a `game_state` message, exactly as the server
/// sends it. Missing or `null` fields take the same defaults the browser
/// client used.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GameStatePayload {
    #[serde(deserialize_with = "null_as_default")]
    pub game_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub players: Vec<String>,
    pub your_player_index: Option<Seat>,
    #[serde(deserialize_with = "null_as_default")]
    pub your_hand: Vec<Card>,
    /// Hand sizes by seat; `None` marks the viewer's own seat.
    #[serde(deserialize_with = "null_as_default")]
    pub other_hands: Vec<Option<u8>>,
    #[serde(deserialize_with = "null_as_default")]
    pub current_trick: Vec<Card>,
    #[serde(deserialize_with = "null_as_default")]
    pub current_player: Seat,
    pub contract: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub trick_number: u8,
    #[serde(deserialize_with = "null_as_default")]
    pub round_complete: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub bidding_phase: bool,
    pub current_bidder: Option<Seat>,
    pub highest_bid: Option<Bid>,
    #[serde(deserialize_with = "null_as_default")]
    pub passes_in_a_row: u8,
}

/// Reads an explicit `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A message from the game server to the client.
///
/// Apart from `game_state`, pushes carry no state the client trusts; they
/// only signal that a fresh snapshot should be pulled.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState {
        state: GameStatePayload,
    },
    GameNotReady {
        #[serde(default)]
        message: Option<String>,
    },
    GameStateUpdate,
    BidMade,
    BidPassed,
    BiddingComplete,
    AllPassed,
    CardsReshuffled,
    TrickComplete,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    PlayError {
        #[serde(default)]
        message: Option<String>,
    },
    /// Any `type` this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self> {
        let msg = serde_json::from_str(text).map_err(ProtocolError::Decode)?;
        if matches!(msg, Self::Unknown) {
            debug!("unrecognized message type: {text}");
        }
        Ok(msg)
    }

    /// Whether this is a payload-free invalidation signal.
    pub fn is_change_notification(&self) -> bool {
        matches!(
            self,
            Self::GameStateUpdate
                | Self::BidMade
                | Self::BidPassed
                | Self::BiddingComplete
                | Self::AllPassed
                | Self::CardsReshuffled
                | Self::TrickComplete
        )
    }

    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameState { .. } => "game_state",
            Self::GameNotReady { .. } => "game_not_ready",
            Self::GameStateUpdate => "game_state_update",
            Self::BidMade => "bid_made",
            Self::BidPassed => "bid_passed",
            Self::BiddingComplete => "bidding_complete",
            Self::AllPassed => "all_passed",
            Self::CardsReshuffled => "cards_reshuffled",
            Self::TrickComplete => "trick_complete",
            Self::Error { .. } => "error",
            Self::PlayError { .. } => "play_error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::GameState { state } => write!(f, "game_state for {}", state.game_id),
            Self::GameNotReady { message: Some(msg) }
            | Self::Error { message: Some(msg) }
            | Self::PlayError { message: Some(msg) } => write!(f, "{}: {msg}", self.kind()),
            _ => write!(f, "{}", self.kind()),
        }
    }
}
