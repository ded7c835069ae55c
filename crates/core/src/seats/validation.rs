//! Business rules checked before any seat plan transition.
//!
//! Validation runs in two passes. [`SeatPlanChangeValidator::validate_input`]
//! checks the request on its own and needs no stored state;
//! [`SeatPlanChangeValidator::validate_transition`] checks the request against
//! the locked plan, the usage snapshot and the pending downgrade.

use thiserror::Error;

use roster_shared::types::CurrencyCode;

use super::types::{ChangeAction, PlanStatus, SeatUsageSnapshot};

/// Largest seat limit a plan may carry.
pub const MAX_SEAT_LIMIT: i64 = 1_000_000;

/// Largest accepted unit price, in minor units.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

/// Longest accepted operator note, in characters.
pub const MAX_NOTES_LEN: usize = 1000;

/// Why a seat change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeRejection {
    /// Upgrade target is not above the current limit.
    #[error("Upgrade target {requested} must be greater than the current limit {current}")]
    InvalidUpgradeTarget {
        /// Live limit.
        current: u32,
        /// Requested limit.
        requested: u32,
    },

    /// Downgrade target is not below the current limit.
    #[error("Downgrade target {requested} must be less than the current limit {current}")]
    InvalidDowngradeTarget {
        /// Live limit.
        current: u32,
        /// Requested limit.
        requested: u32,
    },

    /// More seats are in use than the downgrade would leave.
    #[error("{used} active brokers exceed the requested limit of {requested} seats")]
    DowngradeBelowActiveUsage {
        /// Seats in use.
        used: u32,
        /// Requested limit.
        requested: u32,
    },

    /// A downgrade is already waiting for rollover.
    #[error("A downgrade is already scheduled for this organization")]
    DowngradeAlreadyScheduled,

    /// Currency code is not three uppercase letters.
    #[error("Currency code must be three uppercase letters, got '{0}'")]
    InvalidCurrency(String),

    /// Seat limit is outside `[0, MAX_SEAT_LIMIT]`.
    #[error("Seat limit {0} is outside the allowed range 0..={MAX_SEAT_LIMIT}")]
    InvalidSeatLimit(i64),

    /// Unit price is outside `[0, MAX_UNIT_PRICE_CENTS]`.
    #[error("Unit price {0} is outside the allowed range 0..={MAX_UNIT_PRICE_CENTS}")]
    InvalidUnitPrice(i64),

    /// Notes are longer than `MAX_NOTES_LEN` characters.
    #[error("Notes are {0} characters long; the maximum is {MAX_NOTES_LEN}")]
    NotesTooLong(usize),

    /// The plan is inactive.
    #[error("The seat plan is inactive and cannot be changed")]
    PlanInactive,
}

impl ChangeRejection {
    /// Machine-readable reason.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidUpgradeTarget { .. } => "invalid_upgrade_target",
            Self::InvalidDowngradeTarget { .. } => "invalid_downgrade_target",
            Self::DowngradeBelowActiveUsage { .. } => "downgrade_below_active_usage",
            Self::DowngradeAlreadyScheduled => "downgrade_already_scheduled",
            Self::InvalidCurrency(_) => "invalid_currency",
            Self::InvalidSeatLimit(_) => "invalid_seat_limit",
            Self::InvalidUnitPrice(_) => "invalid_unit_price",
            Self::NotesTooLong(_) => "notes_too_long",
            Self::PlanInactive => "plan_inactive",
        }
    }

    /// True when the request is well-formed but conflicts with stored state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DowngradeBelowActiveUsage { .. }
                | Self::DowngradeAlreadyScheduled
                | Self::PlanInactive
        )
    }
}

/// A request that passed the stateless checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChange {
    /// Target seat limit.
    pub new_limit: u32,
    /// Unit price in minor units.
    pub unit_price_cents: i64,
    /// Parsed currency.
    pub currency_code: CurrencyCode,
    /// Notes, trimmed; blank notes become `None`.
    pub notes: Option<String>,
}

/// Stored state a transition is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ChangeCheck<'a> {
    /// Requested direction.
    pub action: ChangeAction,
    /// Plan status.
    pub plan_status: PlanStatus,
    /// Live limit.
    pub current_limit: u32,
    /// Requested limit.
    pub new_limit: u32,
    /// Current usage.
    pub usage: &'a SeatUsageSnapshot,
    /// Whether a downgrade is already scheduled.
    pub has_scheduled_downgrade: bool,
}

/// Stateless validator for seat plan changes.
pub struct SeatPlanChangeValidator;

impl SeatPlanChangeValidator {
    /// Checks the request fields.
    ///
    /// Order: seat limit, currency, unit price, notes.
    pub fn validate_input(
        new_limit: i64,
        unit_price_cents: i64,
        currency_code: &str,
        notes: Option<&str>,
    ) -> Result<ValidatedChange, ChangeRejection> {
        let new_limit = u32::try_from(new_limit)
            .ok()
            .filter(|limit| i64::from(*limit) <= MAX_SEAT_LIMIT)
            .ok_or(ChangeRejection::InvalidSeatLimit(new_limit))?;

        let currency_code = CurrencyCode::parse(currency_code)
            .map_err(|_| ChangeRejection::InvalidCurrency(currency_code.to_string()))?;

        if !(0..=MAX_UNIT_PRICE_CENTS).contains(&unit_price_cents) {
            return Err(ChangeRejection::InvalidUnitPrice(unit_price_cents));
        }

        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        if let Some(text) = notes {
            let len = text.chars().count();
            if len > MAX_NOTES_LEN {
                return Err(ChangeRejection::NotesTooLong(len));
            }
        }

        Ok(ValidatedChange {
            new_limit,
            unit_price_cents,
            currency_code,
            notes: notes.map(ToString::to_string),
        })
    }

    /// Checks a transition against stored state.
    ///
    /// Order: plan status, direction, usage headroom (downgrades), pending
    /// downgrade (downgrades). Upgrades are allowed while a downgrade is
    /// scheduled.
    pub fn validate_transition(check: &ChangeCheck<'_>) -> Result<(), ChangeRejection> {
        if check.plan_status == PlanStatus::Inactive {
            return Err(ChangeRejection::PlanInactive);
        }

        match check.action {
            ChangeAction::Upgrade => {
                if check.new_limit <= check.current_limit {
                    return Err(ChangeRejection::InvalidUpgradeTarget {
                        current: check.current_limit,
                        requested: check.new_limit,
                    });
                }
            }
            ChangeAction::Downgrade => {
                if check.new_limit >= check.current_limit {
                    return Err(ChangeRejection::InvalidDowngradeTarget {
                        current: check.current_limit,
                        requested: check.new_limit,
                    });
                }
                if check.usage.used > check.new_limit {
                    return Err(ChangeRejection::DowngradeBelowActiveUsage {
                        used: check.usage.used,
                        requested: check.new_limit,
                    });
                }
                if check.has_scheduled_downgrade {
                    return Err(ChangeRejection::DowngradeAlreadyScheduled);
                }
            }
        }

        Ok(())
    }
}
