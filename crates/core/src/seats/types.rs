//! Seat plan domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use roster_shared::types::{CurrencyCode, OrganizationId, SeatPlanChangeId, UserId};

/// Length of one billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    /// One calendar month.
    Monthly,
    /// One calendar year.
    Yearly,
}

impl BillingInterval {
    /// Number of calendar months in one cycle.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Yearly => 12,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for BillingInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown billing interval: {other}")),
        }
    }
}

/// Whether the plan accepts seat changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Plan is live.
    Active,
    /// Plan is suspended; no changes accepted.
    Inactive,
}

/// Direction of a seat plan change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Immediate seat increase with a prorated charge.
    Upgrade,
    /// Seat decrease effective at the next cycle boundary.
    Downgrade,
}

impl ChangeAction {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
        }
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a change row. The only legal transition is `Scheduled → Applied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Recorded, waiting for rollover.
    Scheduled,
    /// In effect.
    Applied,
}

/// The live seat plan of one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPlan {
    /// Owning organization (one plan per organization).
    pub organization_id: OrganizationId,
    /// Currently purchased seats.
    pub seat_limit: u32,
    /// Any historical cycle boundary.
    pub billing_cycle_anchor: DateTime<Utc>,
    /// Cycle length.
    pub billing_cycle_interval: BillingInterval,
    /// Whether changes are accepted.
    pub status: PlanStatus,
}

/// One row of the append-only change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPlanChange {
    /// Change ID.
    pub id: SeatPlanChangeId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Actor who requested the change.
    pub requested_by: UserId,
    /// Upgrade or downgrade.
    pub action: ChangeAction,
    /// Scheduled or applied.
    pub status: ChangeStatus,
    /// Seat limit before the change.
    pub old_limit: u32,
    /// Seat limit after the change.
    pub new_limit: u32,
    /// When the change took (or takes) effect.
    pub effective_at: DateTime<Utc>,
    /// Currency of the unit price.
    pub currency_code: CurrencyCode,
    /// Price of one seat for one full cycle, in minor units.
    pub unit_price_cents: i64,
    /// Amount owed for the remainder of the cycle. Always 0 for downgrades.
    pub prorated_amount_cents: i64,
    /// Length of the cycle the change was computed against.
    pub proration_days_total: u32,
    /// Days left in that cycle at request time.
    pub proration_days_remaining: u32,
    /// Operator notes.
    pub notes: Option<String>,
    /// Free-form key/value data.
    pub metadata: Map<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl SeatPlanChange {
    /// Returns true for a downgrade still waiting for rollover.
    #[must_use]
    pub fn is_pending_downgrade(&self) -> bool {
        self.action == ChangeAction::Downgrade && self.status == ChangeStatus::Scheduled
    }
}

/// Point-in-time view of seat consumption, supplied by the member directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatUsageSnapshot {
    /// Active seat-consuming members.
    pub used: u32,
    /// Seat limit the count was compared against.
    pub seat_limit: u32,
    /// Seats still free (never negative).
    pub available: u32,
}

impl SeatUsageSnapshot {
    /// Builds a snapshot, deriving `available`.
    #[must_use]
    pub const fn new(used: u32, seat_limit: u32) -> Self {
        Self {
            used,
            seat_limit,
            available: seat_limit.saturating_sub(used),
        }
    }

    /// Same usage measured against a different limit.
    #[must_use]
    pub const fn with_limit(self, seat_limit: u32) -> Self {
        Self::new(self.used, seat_limit)
    }
}

/// The billing cycle window containing a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    /// Inclusive start boundary.
    pub start: DateTime<Utc>,
    /// Exclusive end boundary.
    pub end: DateTime<Utc>,
    /// Cycle length.
    pub interval: BillingInterval,
    /// Calendar days between `start` and `end`.
    pub total_days: u32,
    /// Whole days left, rounded up, in `[0, total_days]`.
    pub remaining_days: u32,
}

/// Role of a member inside an organization, as reported by the member directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Organization owner.
    Owner,
    /// Office manager.
    Manager,
    /// Broker (consumes a seat).
    Broker,
    /// Back-office assistant.
    Assistant,
}

impl MemberRole {
    /// Owners and managers may change the seat plan.
    #[must_use]
    pub const fn can_manage_billing(self) -> bool {
        matches!(self, Self::Owner | Self::Manager)
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Broker => "broker",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "manager" => Ok(Self::Manager),
            "broker" => Ok(Self::Broker),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown member role: {other}")),
        }
    }
}

/// A seat change as submitted by an operator, before validation.
#[derive(Debug, Clone)]
pub struct SeatChangeRequest {
    /// Target organization.
    pub organization_id: OrganizationId,
    /// Authenticated actor.
    pub actor: UserId,
    /// Requested seat limit. Range-checked by the validator.
    pub new_limit: i64,
    /// Price of one seat for a full cycle, in minor units.
    pub unit_price_cents: i64,
    /// Three-letter currency code.
    pub currency_code: String,
    /// Optional operator notes.
    pub notes: Option<String>,
}

/// Result of a successful upgrade or downgrade.
#[derive(Debug, Clone, Serialize)]
pub struct SeatChangeOutcome {
    /// The history row that was written.
    pub change: SeatPlanChange,
    /// Usage measured against the limit in force after the call.
    pub usage_snapshot: SeatUsageSnapshot,
}

/// Everything the billing screen shows for an organization.
#[derive(Debug, Clone, Serialize)]
pub struct BillingState {
    /// Live plan.
    pub plan: SeatPlan,
    /// Current usage.
    pub usage: SeatUsageSnapshot,
    /// Current cycle window.
    pub cycle: BillingCycle,
    /// Downgrade waiting for rollover, if any.
    pub pending_downgrade: Option<SeatPlanChange>,
    /// Most recent history rows, newest first.
    pub history: Vec<SeatPlanChange>,
}

/// Kind of audit event emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    /// Upgrade applied immediately.
    SeatUpgradeApplied,
    /// Downgrade recorded for the next boundary.
    SeatDowngradeScheduled,
    /// Scheduled downgrade applied at rollover.
    SeatDowngradeApplied,
    /// Scheduled downgrade applied while usage exceeded the new limit.
    SeatDowngradeAppliedOverUsage,
}

impl AuditEventKind {
    /// Returns the event name written to the audit log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeatUpgradeApplied => "seat_upgrade_applied",
            Self::SeatDowngradeScheduled => "seat_downgrade_scheduled",
            Self::SeatDowngradeApplied => "seat_downgrade_applied",
            Self::SeatDowngradeAppliedOverUsage => "seat_downgrade_applied_over_usage",
        }
    }
}

/// Audit record handed to the external audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event kind.
    pub kind: AuditEventKind,
    /// Organization concerned.
    pub organization_id: OrganizationId,
    /// Human actor, `None` for the reconciler.
    pub actor: Option<UserId>,
    /// Change row the event refers to.
    pub change_id: SeatPlanChangeId,
    /// Limit before.
    pub old_limit: u32,
    /// Limit after.
    pub new_limit: u32,
    /// Amount charged, in minor units.
    pub amount_cents: i64,
    /// Currency of `amount_cents`.
    pub currency_code: CurrencyCode,
    /// Active seats at the time of the event.
    pub seats_used: u32,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Builds an event describing `change`.
    #[must_use]
    pub fn for_change(
        kind: AuditEventKind,
        change: &SeatPlanChange,
        actor: Option<UserId>,
        seats_used: u32,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            organization_id: change.organization_id,
            actor,
            change_id: change.id,
            old_limit: change.old_limit,
            new_limit: change.new_limit,
            amount_cents: change.prorated_amount_cents,
            currency_code: change.currency_code.clone(),
            seats_used,
            occurred_at,
        }
    }
}
