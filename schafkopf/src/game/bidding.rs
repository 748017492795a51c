//! Contract precedence during the bidding phase.
//!
//! Contracts rank, lowest to highest: Rufer, plain Wenz, suited Wenz, Solo.
//! All four Solo suits share one rank, so a Solo can never be outbid by
//! another Solo: the first bidder at a rank keeps priority.
//!
//! These functions only pre-validate what the local player may offer. The
//! server decides whether a bid is accepted.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::entities::{Bid, ContractType, Suit};

/// Precedence of a contract. Higher outbids lower; equal never outbids.
pub type ContractRank = u8;

/// A contract the local player wants to declare.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct ContractBid {
    pub contract_type: ContractType,
    pub trump_suit: Option<Suit>,
    pub called_ace: Option<Suit>,
}

/// Why a contract declaration is malformed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BidError {
    #[error("a Rufer must call an ace")]
    MissingCalledAce,
    #[error("a Solo needs a trump suit")]
    MissingTrumpSuit,
    #[error("a {0} cannot name a trump suit")]
    UnexpectedTrumpSuit(ContractType),
    #[error("only a Rufer calls an ace, not a {0}")]
    UnexpectedCalledAce(ContractType),
    #[error("the Herz ace is a trump and cannot be called")]
    TrumpAceCalled,
}

impl ContractBid {
    pub fn rufer(called_ace: Suit) -> Self {
        Self {
            contract_type: ContractType::Rufer,
            trump_suit: None,
            called_ace: Some(called_ace),
        }
    }

    pub fn wenz(trump_suit: Option<Suit>) -> Self {
        Self {
            contract_type: ContractType::Wenz,
            trump_suit,
            called_ace: None,
        }
    }

    pub fn solo(trump_suit: Suit) -> Self {
        Self {
            contract_type: ContractType::Solo,
            trump_suit: Some(trump_suit),
            called_ace: None,
        }
    }

    /// Checks that the declaration carries exactly the suits its contract needs.
    pub fn validate(&self) -> Result<(), BidError> {
        match (self.contract_type, self.trump_suit, self.called_ace) {
            (ContractType::Rufer, Some(_), _) => {
                Err(BidError::UnexpectedTrumpSuit(ContractType::Rufer))
            }
            (ContractType::Rufer, None, None) => Err(BidError::MissingCalledAce),
            (ContractType::Rufer, None, Some(Suit::Herz)) => Err(BidError::TrumpAceCalled),
            (ContractType::Rufer, None, Some(_)) => Ok(()),
            (other, _, Some(_)) => Err(BidError::UnexpectedCalledAce(other)),
            (ContractType::Solo, None, None) => Err(BidError::MissingTrumpSuit),
            (ContractType::Solo | ContractType::Wenz, _, None) => Ok(()),
        }
    }

    pub fn rank(&self) -> ContractRank {
        rank(self.contract_type, self.trump_suit)
    }
}

impl fmt::Display for ContractBid {
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

impl Bid {
    pub fn rank(&self) -> ContractRank {
        rank(self.contract_type, self.trump_suit)
    }
}

/// Precedence of a contract: Rufer 1, Wenz 2, suited Wenz 3, any Solo 4.
pub fn rank(contract_type: ContractType, trump_suit: Option<Suit>) -> ContractRank {
    match (contract_type, trump_suit) {
        (ContractType::Rufer, _) => 1,
        (ContractType::Wenz, None) => 2,
        (ContractType::Wenz, Some(_)) => 3,
        (ContractType::Solo, _) => 4,
    }
}

/// Whether `candidate` may supersede the current highest bid.
///
/// True when nobody has bid yet, or when the candidate ranks strictly higher.
pub fn can_bid(candidate: &ContractBid, current_highest: Option<&Bid>) -> bool {
    match current_highest {
        None => true,
        Some(highest) => candidate.rank() > highest.rank(),
    }
}

/// Every declaration the bidding menu offers, in menu order.
///
/// Rufer is listed once per callable ace suit.
pub fn contract_menu() -> Vec<ContractBid> {
    let mut menu: Vec<ContractBid> = Suit::ALL
        .iter()
        .map(|&suit| ContractBid::rufer(suit))
        .filter(|bid| bid.validate().is_ok())
        .collect();
    menu.push(ContractBid::wenz(None));
    menu.extend(Suit::ALL.iter().map(|&suit| ContractBid::wenz(Some(suit))));
    menu.extend(Suit::ALL.iter().map(|&suit| ContractBid::solo(suit)));
    menu
}

/// Declarations from [`contract_menu`] that would outbid `current_highest`.
pub fn biddable(current_highest: Option<&Bid>) -> Vec<ContractBid> {
    contract_menu()
        .into_iter()
        .filter(|candidate| can_bid(candidate, current_highest))
        .collect()
}
