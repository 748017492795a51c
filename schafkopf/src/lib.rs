//! # Schafkopf
//!
//! Card model and client-side rules for the Bavarian trick-taking game
//! Schafkopf, plus the JSON wire protocol spoken with the game server.
//!
//! The server is the sole authority on game flow. This crate only holds the
//! rules a client needs to render legal choices before the server confirms
//! them:
//!
//! - **Card ordering**: sorting a hand by suit, rank, trumps first, or a
//!   captured custom order
//! - **Bidding**: contract precedence and whether a bid may outbid the
//!   current highest bid
//!
//! ## Core Modules
//!
//! - [`game`]: cards, contracts, ordering and bidding rules
//! - [`net`]: inbound and outbound protocol messages
//!
//! ## Example
//!
//! ```
//! use schafkopf::{ContractBid, Suit, bidding};
//!
//! // Nothing has been bid yet, so any contract may be offered.
//! assert!(bidding::can_bid(&ContractBid::solo(Suit::Herz), None));
//! ```

/// Cards, contracts and rule engines.
pub mod game;
pub use game::{
    bidding::{self, ContractBid},
    constants::{self, NUM_SEATS},
    entities::{self, Bid, Card, ContractType, Rank, Seat, Suit},
    ordering::{self, HandSorter, SortMode},
};

/// Wire protocol.
pub mod net;
pub use net::{
    errors::ProtocolError,
    messages::{self, ClientMessage, GameStatePayload, ServerMessage},
};
