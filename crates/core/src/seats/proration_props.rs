//! Property-based tests for ProrationCalculator.

use proptest::prelude::*;

use crate::seats::proration::{ProrationCalculator, ProrationInput};

fn arb_price() -> impl Strategy<Value = i64> {
    0i64..=100_000_000i64
}

/// Strategy for (total_days, remaining_days) with remaining <= total.
fn arb_days() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=366u32).prop_flat_map(|total| (Just(total), 0u32..=total))
}

fn amount(old: u32, new: u32, price: i64, total: u32, remaining: u32) -> i64 {
    ProrationCalculator::calculate_upgrade_proration(&ProrationInput {
        old_limit: old,
        new_limit: new,
        unit_price_cents: price,
        cycle_total_days: total,
        cycle_remaining_days: remaining,
    })
    .unwrap()
    .prorated_amount_cents
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Adding more seats never costs less.
    #[test]
    fn prop_monotonic_in_seats(
        old in 0u32..1_000u32,
        delta in 1u32..1_000u32,
        extra in 1u32..1_000u32,
        price in arb_price(),
        (total, remaining) in arb_days(),
    ) {
        let smaller = amount(old, old + delta, price, total, remaining);
        let larger = amount(old, old + delta + extra, price, total, remaining);
        prop_assert!(smaller <= larger);
    }

    /// More days left never costs less.
    #[test]
    fn prop_monotonic_in_remaining_days(
        delta in 1u32..1_000u32,
        price in arb_price(),
        (total, remaining) in arb_days(),
    ) {
        prop_assume!(remaining < total);
        let fewer = amount(0, delta, price, total, remaining);
        let more = amount(0, delta, price, total, remaining + 1);
        prop_assert!(fewer <= more);
    }

    /// A full cycle costs exactly unit price times seats added.
    #[test]
    fn prop_full_cycle_is_exact(
        delta in 1u32..10_000u32,
        price in arb_price(),
        total in 1u32..=366u32,
    ) {
        prop_assert_eq!(
            amount(3, 3 + delta, price, total, total),
            price * i64::from(delta)
        );
    }

    /// No days left means nothing owed.
    #[test]
    fn prop_zero_remaining_is_free(
        delta in 1u32..10_000u32,
        price in arb_price(),
        total in 0u32..=366u32,
    ) {
        prop_assert_eq!(amount(0, delta, price, total, 0), 0);
    }

    /// A paid upgrade with time left is never free and never exceeds the full price.
    #[test]
    fn prop_bounded_and_never_zero(
        delta in 1u32..10_000u32,
        price in 1i64..=100_000_000i64,
        (total, remaining) in arb_days(),
    ) {
        prop_assume!(remaining > 0);
        let charged = amount(0, delta, price, total, remaining);
        prop_assert!(charged >= 1);
        prop_assert!(charged <= price * i64::from(delta));
    }
}
