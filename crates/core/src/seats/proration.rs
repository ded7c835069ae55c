//! Prorated charges for mid-cycle seat upgrades.
//!
//! The exact amount `unit_price * seats_delta * remaining_days / total_days` is
//! computed with `Decimal` and rounded to whole minor units with Banker's
//! Rounding (`MidpointNearestEven`), the strategy used for all currency
//! rounding in this codebase. A positive exact amount that rounds to zero is
//! charged as one minor unit.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from proration arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProrationError {
    /// The amount does not fit in an `i64` of minor units.
    #[error("Prorated amount overflows: {unit_price_cents} x {seats_delta} seats")]
    Overflow {
        /// Unit price in minor units.
        unit_price_cents: i64,
        /// Seats added.
        seats_delta: u32,
    },
}

/// Input for an upgrade proration.
///
/// `new_limit > old_limit` is the caller's responsibility; a non-increasing
/// pair simply prorates zero seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProrationInput {
    /// Seat limit before the upgrade.
    pub old_limit: u32,
    /// Seat limit after the upgrade.
    pub new_limit: u32,
    /// Price of one seat for one full cycle, in minor units.
    pub unit_price_cents: i64,
    /// Length of the current cycle.
    pub cycle_total_days: u32,
    /// Days left in the current cycle.
    pub cycle_remaining_days: u32,
}

/// Breakdown of an upgrade charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProrationResult {
    /// Seats added.
    pub seats_delta: u32,
    /// Price of one seat for one full cycle.
    pub unit_price_cents: i64,
    /// Cycle length used.
    pub total_days: u32,
    /// Remaining days used (clamped to `total_days`).
    pub remaining_days: u32,
    /// Amount owed now, in minor units. Never negative.
    pub prorated_amount_cents: i64,
}

/// Stateless calculator for upgrade charges.
pub struct ProrationCalculator;

impl ProrationCalculator {
    /// Computes the charge for adding seats with `remaining_days` left in the cycle.
    ///
    /// # Errors
    ///
    /// Returns `ProrationError::Overflow` if the amount exceeds `i64` minor units.
    pub fn calculate_upgrade_proration(
        input: &ProrationInput,
    ) -> Result<ProrationResult, ProrationError> {
        let seats_delta = input.new_limit.saturating_sub(input.old_limit);
        let total_days = input.cycle_total_days;
        let remaining_days = input.cycle_remaining_days.min(total_days);
        let unit_price_cents = input.unit_price_cents.max(0);

        let prorated_amount_cents = if total_days == 0 || remaining_days == 0 {
            0
        } else {
            Self::prorate(unit_price_cents, seats_delta, remaining_days, total_days)?
        };

        Ok(ProrationResult {
            seats_delta,
            unit_price_cents,
            total_days,
            remaining_days,
            prorated_amount_cents,
        })
    }

    fn prorate(
        unit_price_cents: i64,
        seats_delta: u32,
        remaining_days: u32,
        total_days: u32,
    ) -> Result<i64, ProrationError> {
        let overflow = || ProrationError::Overflow {
            unit_price_cents,
            seats_delta,
        };

        let exact = Decimal::from(unit_price_cents)
            .checked_mul(Decimal::from(seats_delta))
            .and_then(|v| v.checked_mul(Decimal::from(remaining_days)))
            .and_then(|v| v.checked_div(Decimal::from(total_days)))
            .ok_or_else(overflow)?;

        let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let rounded = if rounded.is_zero() && exact > Decimal::ZERO {
            Decimal::ONE
        } else {
            rounded
        };

        rounded.to_i64().ok_or_else(overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn input(old: u32, new: u32, price: i64, total: u32, remaining: u32) -> ProrationInput {
        ProrationInput {
            old_limit: old,
            new_limit: new,
            unit_price_cents: price,
            cycle_total_days: total,
            cycle_remaining_days: remaining,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(5, 8, 1000, 30, 10)).unwrap();

        assert_eq!(result.seats_delta, 3);
        assert_eq!(result.unit_price_cents, 1000);
        assert_eq!(result.total_days, 30);
        assert_eq!(result.remaining_days, 10);
        assert_eq!(result.prorated_amount_cents, 1000);
    }

    #[test]
    fn test_full_cycle_charges_full_price() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(2, 6, 4990, 31, 31)).unwrap();
        assert_eq!(result.prorated_amount_cents, 4990 * 4);
    }

    #[test]
    fn test_no_days_left_is_free() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(2, 6, 4990, 31, 0)).unwrap();
        assert_eq!(result.prorated_amount_cents, 0);
    }

    #[test]
    fn test_degenerate_cycle_is_free() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(1, 2, 1000, 0, 0)).unwrap();
        assert_eq!(result.prorated_amount_cents, 0);
        assert_eq!(result.total_days, 0);
    }

    #[rstest]
    // 1000 * 1 * 1 / 16 = 62.5 -> 62 (even)
    #[case(1000, 1, 1, 16, 62)]
    // 1000 * 3 * 1 / 16 = 187.5 -> 188 (even)
    #[case(1000, 3, 1, 16, 188)]
    // 100 * 1 * 10 / 30 = 33.33 -> 33
    #[case(100, 1, 10, 30, 33)]
    // 100 * 2 * 10 / 30 = 66.67 -> 67
    #[case(100, 2, 10, 30, 67)]
    fn test_bankers_rounding(
        #[case] price: i64,
        #[case] delta: u32,
        #[case] remaining: u32,
        #[case] total: u32,
        #[case] expected: i64,
    ) {
        let result = ProrationCalculator::calculate_upgrade_proration(&input(
            10,
            10 + delta,
            price,
            total,
            remaining,
        ))
        .unwrap();
        assert_eq!(result.prorated_amount_cents, expected);
    }

    #[test]
    fn test_tiny_positive_amount_is_never_zero() {
        // 1 * 1 * 1 / 366 = 0.0027 cents
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(0, 1, 1, 366, 1)).unwrap();
        assert_eq!(result.prorated_amount_cents, 1);
    }

    #[test]
    fn test_free_seats_stay_free() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(0, 5, 0, 30, 15)).unwrap();
        assert_eq!(result.prorated_amount_cents, 0);
    }

    #[test]
    fn test_remaining_clamped_to_total() {
        let result =
            ProrationCalculator::calculate_upgrade_proration(&input(1, 2, 900, 30, 45)).unwrap();
        assert_eq!(result.remaining_days, 30);
        assert_eq!(result.prorated_amount_cents, 900);
    }

    #[test]
    fn test_overflow_is_reported() {
        let result = ProrationCalculator::calculate_upgrade_proration(&input(
            0,
            u32::MAX,
            i64::MAX,
            366,
            366,
        ));
        assert!(matches!(result, Err(ProrationError::Overflow { .. })));
    }
}
