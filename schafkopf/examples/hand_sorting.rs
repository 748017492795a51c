//! Hand Sorting Example
//!
//! Shows one hand in every sort mode and which cards are trump under each
//! contract, then lists the contracts that may still be bid.

use schafkopf::{
    Bid, Card, ContractType, HandSorter, Rank, SortMode, Suit, bidding,
    ordering::is_trump,
};

fn main() {
    println!("=== Schafkopf Hand Sorting Example ===\n");

    let hand = vec![
        Card::new(Suit::Schellen, Rank::Seven),
        Card::new(Suit::Herz, Rank::King),
        Card::new(Suit::Eichel, Rank::Ober),
        Card::new(Suit::Gras, Rank::Ace),
        Card::new(Suit::Herz, Rank::Unter),
        Card::new(Suit::Eichel, Rank::Ten),
        Card::new(Suit::Gras, Rank::Nine),
        Card::new(Suit::Schellen, Rank::Unter),
    ];
    println!("Dealt: {}\n", join(&hand));

    // Example 1: every sort mode
    println!("Example 1: Sort modes");
    let mut sorter = HandSorter::new();
    for mode in [SortMode::Suit, SortMode::Rank, SortMode::Trump] {
        println!("  {:<6} {}", mode.to_string(), join(&sorter.sort(&hand, mode)));
    }

    // Capture the rank order, then show it back as the custom order
    let by_rank = sorter.sort(&hand, SortMode::Rank);
    sorter.capture_custom(&by_rank);
    println!("  custom {}\n", join(&sorter.sort(&hand, SortMode::Custom)));

    // Example 2: trumps per contract
    println!("Example 2: Trumps per contract");
    let contracts = [
        (ContractType::Rufer, None),
        (ContractType::Wenz, None),
        (ContractType::Solo, Some(Suit::Gras)),
    ];
    for (contract_type, trump_suit) in contracts {
        let trumps: Vec<Card> = hand
            .iter()
            .copied()
            .filter(|card| is_trump(card, contract_type, trump_suit))
            .collect();
        println!("  {:<5} {} trumps: {}", contract_type.to_string(), trumps.len(), join(&trumps));
    }

    // Example 3: what may still be bid over a plain Wenz
    println!("\nExample 3: Bidding over a Wenz");
    let highest = Bid {
        contract_type: ContractType::Wenz,
        trump_suit: None,
        called_ace: None,
        bidder_seat: 0,
    };
    for option in bidding::biddable(Some(&highest)) {
        println!("  {option}");
    }
}

fn join(cards: &[Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
