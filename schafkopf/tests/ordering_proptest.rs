/// Property-based tests for hand ordering using proptest
///
/// Hands are drawn from the 32-card deck without duplicates and in random
/// order, 0 to 8 cards each.
use proptest::prelude::*;
use schafkopf::{
    Card, HandSorter, SortMode,
    constants::HAND_SIZE,
    entities::full_deck,
    ordering::is_display_trump,
};
use std::collections::BTreeSet;

// Strategy to generate a valid hand (unique cards, shuffled)
fn hand_strategy() -> impl Strategy<Value = Vec<Card>> {
    prop::sample::subsequence(full_deck(), 0..=HAND_SIZE).prop_shuffle()
}

fn mode_strategy() -> impl Strategy<Value = SortMode> {
    prop_oneof![
        Just(SortMode::Suit),
        Just(SortMode::Rank),
        Just(SortMode::Trump),
        Just(SortMode::Custom),
    ]
}

fn same_cards(a: &[Card], b: &[Card]) -> bool {
    let a: BTreeSet<_> = a.iter().collect();
    let b: BTreeSet<_> = b.iter().collect();
    a == b
}

proptest! {
    #[test]
    fn test_suit_sort_is_total_order(hand in hand_strategy()) {
        let sorted = HandSorter::new().sort(&hand, SortMode::Suit);

        // Every card appears exactly once
        prop_assert_eq!(sorted.len(), hand.len());
        prop_assert!(same_cards(&sorted, &hand));

        // Primary key suit, secondary key rank, both non-decreasing
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(a.suit.precedence() <= b.suit.precedence());
            if a.suit == b.suit {
                prop_assert!(a.rank.precedence() < b.rank.precedence());
            }
        }
    }

    #[test]
    fn test_rank_sort_is_total_order(hand in hand_strategy()) {
        let sorted = HandSorter::new().sort(&hand, SortMode::Rank);

        prop_assert!(same_cards(&sorted, &hand));
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(a.rank.precedence() <= b.rank.precedence());
            if a.rank == b.rank {
                prop_assert!(a.suit.precedence() < b.suit.precedence());
            }
        }
    }

    #[test]
    fn test_trump_sort_puts_trumps_first(hand in hand_strategy()) {
        let sorted = HandSorter::new().sort(&hand, SortMode::Trump);

        prop_assert!(same_cards(&sorted, &hand));
        let first_plain = sorted.iter().position(|c| !is_display_trump(c)).unwrap_or(sorted.len());
        prop_assert!(sorted[..first_plain].iter().all(is_display_trump));
        prop_assert!(!sorted[first_plain..].iter().any(is_display_trump));

        for part in [&sorted[..first_plain], &sorted[first_plain..]] {
            for pair in part.windows(2) {
                prop_assert!(pair[0].suit.precedence() <= pair[1].suit.precedence());
            }
        }
    }

    #[test]
    fn test_sort_is_idempotent(hand in hand_strategy(), mode in mode_strategy()) {
        let sorter = HandSorter::new();
        let once = sorter.sort(&hand, mode);
        let twice = sorter.sort(&once, mode);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_sort_is_idempotent_with_custom_order(
        captured in hand_strategy(),
        hand in hand_strategy(),
        mode in mode_strategy(),
    ) {
        let mut sorter = HandSorter::new();
        sorter.capture_custom(&captured);
        let once = sorter.sort(&hand, mode);
        let twice = sorter.sort(&once, mode);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_sort_ignores_input_order(hand in hand_strategy()) {
        // Valid hands have no duplicate (suit, rank) pairs, so these modes
        // are fully determined by their keys.
        let sorter = HandSorter::new();
        let mut reversed = hand.clone();
        reversed.reverse();
        for mode in [SortMode::Suit, SortMode::Rank] {
            prop_assert_eq!(sorter.sort(&hand, mode), sorter.sort(&reversed, mode));
        }
    }
}
