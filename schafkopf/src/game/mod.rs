//! Schafkopf rules the client needs before the server confirms anything.
//!
//! - [`entities`]: cards, suits, ranks, contracts and bids
//! - [`ordering`]: hand sorting and trump classification
//! - [`bidding`]: contract precedence and bid pre-validation

pub mod bidding;
pub mod constants;
pub mod entities;
pub mod ordering;
