//! Billing cycle window computation.
//!
//! Boundaries are calendar based: boundary `k` is `anchor + k * interval`
//! computed directly from the anchor with chrono's month arithmetic. When the
//! anchor's day of month does not exist in the target month the last day of that
//! month is used, so an anchor on January 31st yields February 28th (29th in leap
//! years), then March 31st, April 30th and so on. Because every boundary is
//! derived from the anchor and never from the previous, already clamped,
//! boundary, the cycle length cannot drift.

use chrono::{DateTime, Datelike, Months, Utc};
use thiserror::Error;

use super::types::{BillingCycle, BillingInterval};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Errors from cycle arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// A boundary fell outside chrono's representable range.
    #[error("Billing cycle boundary {index} from anchor {anchor} is out of range")]
    BoundaryOutOfRange {
        /// Anchor the boundary was derived from.
        anchor: DateTime<Utc>,
        /// Boundary index.
        index: i64,
    },
}

/// Stateless calculator for billing cycle windows.
pub struct BillingCycleCalculator;

impl BillingCycleCalculator {
    /// Computes the cycle containing `now`.
    ///
    /// The returned window satisfies `start <= now < end`. An instant exactly on a
    /// boundary belongs to the cycle that starts there. Anchors later than `now`
    /// are allowed; the calculator walks backwards from them.
    ///
    /// # Errors
    ///
    /// Returns `CycleError::BoundaryOutOfRange` if a boundary cannot be represented.
    pub fn compute_cycle(
        anchor: DateTime<Utc>,
        interval: BillingInterval,
        now: DateTime<Utc>,
    ) -> Result<BillingCycle, CycleError> {
        let step = i64::from(interval.months());
        let months_apart = i64::from(now.year() - anchor.year()) * 12
            + i64::from(now.month()) - i64::from(anchor.month());
        let mut index = months_apart.div_euclid(step);

        // The month estimate is off by at most one in either direction.
        while Self::boundary(anchor, interval, index)? > now {
            index -= 1;
        }
        while Self::boundary(anchor, interval, index + 1)? <= now {
            index += 1;
        }

        let start = Self::boundary(anchor, interval, index)?;
        let end = Self::boundary(anchor, interval, index + 1)?;

        let total_days = u32::try_from((end.date_naive() - start.date_naive()).num_days())
            .map_err(|_| CycleError::BoundaryOutOfRange { anchor, index })?;

        let left = (end - now).num_milliseconds();
        let remaining = (left + MILLIS_PER_DAY - 1).div_euclid(MILLIS_PER_DAY);
        let remaining_days = u32::try_from(remaining.max(0))
            .unwrap_or(u32::MAX)
            .min(total_days);

        Ok(BillingCycle {
            start,
            end,
            interval,
            total_days,
            remaining_days,
        })
    }

    /// Returns boundary number `index` (negative indices lie before the anchor).
    ///
    /// # Errors
    ///
    /// Returns `CycleError::BoundaryOutOfRange` if the boundary cannot be represented.
    pub fn boundary(
        anchor: DateTime<Utc>,
        interval: BillingInterval,
        index: i64,
    ) -> Result<DateTime<Utc>, CycleError> {
        let out_of_range = || CycleError::BoundaryOutOfRange { anchor, index };

        let months = index
            .checked_mul(i64::from(interval.months()))
            .ok_or_else(out_of_range)?;
        let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?;

        let shifted = if months >= 0 {
            anchor.checked_add_months(Months::new(magnitude))
        } else {
            anchor.checked_sub_months(Months::new(magnitude))
        };

        shifted.ok_or_else(out_of_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn at_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_monthly_cycle_mid_month() {
        let cycle =
            BillingCycleCalculator::compute_cycle(at(2025, 1, 1), BillingInterval::Monthly, at(2025, 4, 21))
                .unwrap();

        assert_eq!(cycle.start, at(2025, 4, 1));
        assert_eq!(cycle.end, at(2025, 5, 1));
        assert_eq!(cycle.total_days, 30);
        assert_eq!(cycle.remaining_days, 10);
        assert_eq!(cycle.interval, BillingInterval::Monthly);
    }

    #[test]
    fn test_now_on_boundary_starts_new_cycle() {
        let cycle =
            BillingCycleCalculator::compute_cycle(at(2025, 1, 15), BillingInterval::Monthly, at(2025, 3, 15))
                .unwrap();

        assert_eq!(cycle.start, at(2025, 3, 15));
        assert_eq!(cycle.end, at(2025, 4, 15));
        assert_eq!(cycle.remaining_days, cycle.total_days);
    }

    #[test]
    fn test_one_second_before_boundary_is_previous_cycle() {
        let cycle = BillingCycleCalculator::compute_cycle(
            at(2025, 1, 15),
            BillingInterval::Monthly,
            at_hms(2025, 3, 14, 23, 59, 59),
        )
        .unwrap();

        assert_eq!(cycle.start, at(2025, 2, 15));
        assert_eq!(cycle.end, at(2025, 3, 15));
        assert_eq!(cycle.total_days, 28);
        assert_eq!(cycle.remaining_days, 1);
    }

    #[rstest]
    #[case(2025, at(2025, 2, 28), 28)]
    #[case(2024, at(2024, 2, 29), 29)]
    fn test_month_end_anchor_clamps_february(
        #[case] year: i32,
        #[case] february_boundary: DateTime<Utc>,
        #[case] january_length: u32,
    ) {
        let anchor = at(year, 1, 31);
        let cycle =
            BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Monthly, at(year, 2, 10))
                .unwrap();

        assert_eq!(cycle.start, anchor);
        assert_eq!(cycle.end, february_boundary);
        assert_eq!(cycle.total_days, january_length);
    }

    #[test]
    fn test_month_end_anchor_does_not_drift() {
        let anchor = at(2025, 1, 31);
        let expected = [
            at(2025, 1, 31),
            at(2025, 2, 28),
            at(2025, 3, 31),
            at(2025, 4, 30),
            at(2025, 5, 31),
            at(2025, 6, 30),
        ];
        for (index, boundary) in expected.iter().enumerate() {
            let index = i64::try_from(index).unwrap();
            assert_eq!(
                BillingCycleCalculator::boundary(anchor, BillingInterval::Monthly, index).unwrap(),
                *boundary
            );
        }

        // March cycle still ends on the 31st even though February was clamped.
        let cycle =
            BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Monthly, at(2025, 3, 5))
                .unwrap();
        assert_eq!(cycle.start, at(2025, 2, 28));
        assert_eq!(cycle.end, at(2025, 3, 31));
        assert_eq!(cycle.total_days, 31);
    }

    #[test]
    fn test_clamp_is_stable_across_calls() {
        let anchor = at(2025, 1, 31);
        let now = at_hms(2025, 2, 20, 8, 30, 0);
        let first = BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Monthly, now).unwrap();
        for _ in 0..5 {
            let again =
                BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Monthly, now).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_yearly_cycle_leap_day_anchor() {
        let anchor = at(2024, 2, 29);
        let cycle =
            BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Yearly, at(2025, 6, 1)).unwrap();

        assert_eq!(cycle.start, at(2025, 2, 28));
        assert_eq!(cycle.end, at(2026, 2, 28));
        assert_eq!(cycle.total_days, 365);

        let back_in_leap =
            BillingCycleCalculator::compute_cycle(anchor, BillingInterval::Yearly, at(2028, 3, 1)).unwrap();
        assert_eq!(back_in_leap.start, at(2028, 2, 29));
    }

    #[test]
    fn test_future_anchor_walks_backwards() {
        let cycle =
            BillingCycleCalculator::compute_cycle(at(2026, 6, 10), BillingInterval::Monthly, at(2026, 1, 20))
                .unwrap();

        assert_eq!(cycle.start, at(2026, 1, 10));
        assert_eq!(cycle.end, at(2026, 2, 10));
    }

    #[test]
    fn test_remaining_days_round_up_partial_days() {
        let cycle = BillingCycleCalculator::compute_cycle(
            at(2025, 1, 1),
            BillingInterval::Monthly,
            at_hms(2025, 4, 30, 0, 0, 1),
        )
        .unwrap();

        assert_eq!(cycle.end, at(2025, 5, 1));
        assert_eq!(cycle.remaining_days, 1);
    }

    #[test]
    fn test_anchor_time_of_day_is_preserved() {
        let anchor = at_hms(2025, 1, 10, 15, 0, 0);
        let cycle = BillingCycleCalculator::compute_cycle(
            anchor,
            BillingInterval::Monthly,
            at_hms(2025, 2, 10, 14, 59, 59),
        )
        .unwrap();

        assert_eq!(cycle.start, anchor);
        assert_eq!(cycle.end, at_hms(2025, 2, 10, 15, 0, 0));
        assert_eq!(cycle.remaining_days, 1);
        assert_eq!(cycle.total_days, 31);
    }

    #[test]
    fn test_boundary_out_of_range() {
        let result = BillingCycleCalculator::boundary(at(2025, 1, 1), BillingInterval::Yearly, i64::MAX);
        assert!(matches!(result, Err(CycleError::BoundaryOutOfRange { .. })));
    }
}
