//! Property-based tests for BillingCycleCalculator.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use crate::seats::cycle::BillingCycleCalculator;
use crate::seats::types::BillingInterval;

/// Strategy for instants between 2000 and 2100, second precision.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..4_102_444_800i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

fn arb_interval() -> impl Strategy<Value = BillingInterval> {
    prop_oneof![Just(BillingInterval::Monthly), Just(BillingInterval::Yearly)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The window always contains `now` and its day counts are consistent.
    #[test]
    fn prop_window_contains_now(
        anchor in arb_instant(),
        now in arb_instant(),
        interval in arb_interval(),
    ) {
        let cycle = BillingCycleCalculator::compute_cycle(anchor, interval, now).unwrap();

        prop_assert!(cycle.start <= now);
        prop_assert!(now < cycle.end);
        prop_assert_eq!(
            i64::from(cycle.total_days),
            (cycle.end.date_naive() - cycle.start.date_naive()).num_days()
        );
        prop_assert!(cycle.remaining_days <= cycle.total_days);
        prop_assert!(cycle.remaining_days >= 1);
    }

    /// Cycle lengths are bounded by the calendar.
    #[test]
    fn prop_total_days_calendar_bounds(
        anchor in arb_instant(),
        now in arb_instant(),
        interval in arb_interval(),
    ) {
        let cycle = BillingCycleCalculator::compute_cycle(anchor, interval, now).unwrap();
        match interval {
            BillingInterval::Monthly => prop_assert!((28..=31).contains(&cycle.total_days)),
            BillingInterval::Yearly => prop_assert!((365..=366).contains(&cycle.total_days)),
        }
    }

    /// Every instant inside one window maps back to that same window.
    #[test]
    fn prop_window_is_stable_inside_cycle(
        anchor in arb_instant(),
        now in arb_instant(),
        interval in arb_interval(),
        offset_secs in 0i64..(28 * 86_400),
    ) {
        let cycle = BillingCycleCalculator::compute_cycle(anchor, interval, now).unwrap();
        let probe = cycle.start + Duration::seconds(offset_secs);
        prop_assume!(probe < cycle.end);

        let again = BillingCycleCalculator::compute_cycle(anchor, interval, probe).unwrap();
        prop_assert_eq!(again.start, cycle.start);
        prop_assert_eq!(again.end, cycle.end);
    }

    /// The end of one window is the start of the next.
    #[test]
    fn prop_windows_are_contiguous(
        anchor in arb_instant(),
        now in arb_instant(),
        interval in arb_interval(),
    ) {
        let cycle = BillingCycleCalculator::compute_cycle(anchor, interval, now).unwrap();
        let next = BillingCycleCalculator::compute_cycle(anchor, interval, cycle.end).unwrap();

        prop_assert_eq!(next.start, cycle.end);
        prop_assert_eq!(next.remaining_days, next.total_days);
    }
}
