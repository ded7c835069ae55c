//! Seat billing orchestration.
//!
//! `SeatBillingService` is the only writer of seat plans outside the
//! rollover reconciler. Every change runs inside one unit of work so the plan
//! row, the history row and the pending downgrade check observe a single
//! serialized view of the organization.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use roster_shared::BillingConfig;
use roster_shared::types::{OrganizationId, SeatPlanChangeId, UserId};

use super::cycle::BillingCycleCalculator;
use super::error::{SeatBillingError, StoreError};
use super::proration::{ProrationCalculator, ProrationInput};
use super::store::{AuditSink, Clock, RoleResolver, SeatPlanStore, SeatUsageReader, SystemClock};
use super::types::{
    AuditEvent, AuditEventKind, BillingCycle, BillingState, ChangeAction, ChangeStatus,
    SeatChangeOutcome, SeatChangeRequest, SeatPlan, SeatPlanChange, SeatUsageSnapshot,
};
use super::validation::{ChangeCheck, ChangeRejection, SeatPlanChangeValidator};

/// Tunables for the seat engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatBillingSettings {
    /// History rows returned with the billing state.
    pub history_limit: u64,
    /// Upper bound for one storage call.
    pub storage_timeout: Duration,
}

impl Default for SeatBillingSettings {
    fn default() -> Self {
        Self::from(&BillingConfig::default())
    }
}

impl From<&BillingConfig> for SeatBillingSettings {
    fn from(config: &BillingConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            storage_timeout: Duration::from_millis(config.storage_timeout_ms),
        }
    }
}

/// Runs a storage call, reporting it unavailable if it exceeds `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
        Err(StoreError::Unavailable(format!(
            "storage call exceeded {} ms",
            limit.as_millis()
        )))
    })
}

/// Orchestrates seat plan reads, upgrades and downgrade scheduling.
pub struct SeatBillingService {
    store: Arc<dyn SeatPlanStore>,
    usage: Arc<dyn SeatUsageReader>,
    roles: Arc<dyn RoleResolver>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    settings: SeatBillingSettings,
}

impl SeatBillingService {
    /// Creates a service using the wall clock and default settings.
    pub fn new(
        store: Arc<dyn SeatPlanStore>,
        usage: Arc<dyn SeatUsageReader>,
        roles: Arc<dyn RoleResolver>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            usage,
            roles,
            audit,
            clock: Arc::new(SystemClock),
            settings: SeatBillingSettings::default(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: SeatBillingSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the active settings.
    pub const fn settings(&self) -> &SeatBillingSettings {
        &self.settings
    }

    /// Reads the plan, usage, current cycle, pending downgrade and recent history.
    ///
    /// Any member of the organization may read it. Nothing is mutated.
    pub async fn get_billing_state(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<BillingState, SeatBillingError> {
        self.authorize(organization_id, actor, false).await?;

        let limit = self.settings.storage_timeout;
        let plan = bounded(limit, self.store.find_plan(organization_id))
            .await?
            .ok_or(SeatBillingError::PlanNotFound(organization_id))?;
        let usage = bounded(limit, self.usage.usage(organization_id)).await?;
        let pending_downgrade =
            bounded(limit, self.store.scheduled_downgrade(organization_id)).await?;
        let history = bounded(
            limit,
            self.store
                .recent_changes(organization_id, self.settings.history_limit),
        )
        .await?;

        let cycle = Self::cycle_for(&plan, self.clock.now())?;

        Ok(BillingState {
            usage: usage.with_limit(plan.seat_limit),
            plan,
            cycle,
            pending_downgrade,
            history,
        })
    }

    /// Computes the current billing cycle window for an organization.
    pub async fn current_cycle(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<BillingCycle, SeatBillingError> {
        self.authorize(organization_id, actor, false).await?;

        let plan = bounded(
            self.settings.storage_timeout,
            self.store.find_plan(organization_id),
        )
        .await?
        .ok_or(SeatBillingError::PlanNotFound(organization_id))?;

        Self::cycle_for(&plan, self.clock.now())
    }

    /// Raises the seat limit immediately and records the prorated charge.
    pub async fn apply_upgrade(
        &self,
        request: SeatChangeRequest,
    ) -> Result<SeatChangeOutcome, SeatBillingError> {
        let (organization_id, actor) = (request.organization_id, request.actor);
        self.change_seats(ChangeAction::Upgrade, request)
            .await
            .inspect_err(|err| log_failure(ChangeAction::Upgrade, organization_id, actor, err))
    }

    /// Records a seat decrease that takes effect at the end of the current cycle.
    ///
    /// The live limit is never touched here; the rollover reconciler applies it.
    pub async fn schedule_downgrade(
        &self,
        request: SeatChangeRequest,
    ) -> Result<SeatChangeOutcome, SeatBillingError> {
        let (organization_id, actor) = (request.organization_id, request.actor);
        self.change_seats(ChangeAction::Downgrade, request)
            .await
            .inspect_err(|err| log_failure(ChangeAction::Downgrade, organization_id, actor, err))
    }

    async fn change_seats(
        &self,
        action: ChangeAction,
        request: SeatChangeRequest,
    ) -> Result<SeatChangeOutcome, SeatBillingError> {
        let organization_id = request.organization_id;
        self.authorize(organization_id, request.actor, true).await?;

        let input = SeatPlanChangeValidator::validate_input(
            request.new_limit,
            request.unit_price_cents,
            &request.currency_code,
            request.notes.as_deref(),
        )?;

        let limit = self.settings.storage_timeout;

        // Usage comes from the member directory and is read outside the lock.
        let usage = bounded(limit, self.usage.usage(organization_id)).await?;

        let mut uow = bounded(limit, self.store.begin(organization_id)).await?;
        let plan = bounded(limit, uow.plan())
            .await?
            .ok_or(SeatBillingError::PlanNotFound(organization_id))?;
        let pending = bounded(limit, uow.scheduled_downgrade()).await?;
        let usage = usage.with_limit(plan.seat_limit);

        SeatPlanChangeValidator::validate_transition(&ChangeCheck {
            action,
            plan_status: plan.status,
            current_limit: plan.seat_limit,
            new_limit: input.new_limit,
            usage: &usage,
            has_scheduled_downgrade: pending.is_some(),
        })?;

        let now = self.clock.now();
        let cycle = Self::cycle_for(&plan, now)?;

        let (status, effective_at, prorated_amount_cents) = match action {
            ChangeAction::Upgrade => {
                let proration =
                    ProrationCalculator::calculate_upgrade_proration(&ProrationInput {
                        old_limit: plan.seat_limit,
                        new_limit: input.new_limit,
                        unit_price_cents: input.unit_price_cents,
                        cycle_total_days: cycle.total_days,
                        cycle_remaining_days: cycle.remaining_days,
                    })?;
                (ChangeStatus::Applied, now, proration.prorated_amount_cents)
            }
            ChangeAction::Downgrade => (ChangeStatus::Scheduled, cycle.end, 0),
        };

        let change = SeatPlanChange {
            id: SeatPlanChangeId::new(),
            organization_id,
            requested_by: request.actor,
            action,
            status,
            old_limit: plan.seat_limit,
            new_limit: input.new_limit,
            effective_at,
            currency_code: input.currency_code,
            unit_price_cents: input.unit_price_cents,
            prorated_amount_cents,
            proration_days_total: cycle.total_days,
            proration_days_remaining: cycle.remaining_days,
            notes: input.notes,
            metadata: change_metadata(&cycle, &usage),
            created_at: now,
        };

        if action == ChangeAction::Upgrade {
            bounded(limit, uow.set_seat_limit(change.new_limit)).await?;
        }
        bounded(limit, uow.insert_change(&change))
            .await
            .map_err(downgrade_conflict)?;
        bounded(limit, uow.commit()).await.map_err(downgrade_conflict)?;

        let (kind, usage_snapshot) = match action {
            ChangeAction::Upgrade => (
                AuditEventKind::SeatUpgradeApplied,
                usage.with_limit(change.new_limit),
            ),
            ChangeAction::Downgrade => (AuditEventKind::SeatDowngradeScheduled, usage),
        };

        info!(
            organization_id = %organization_id,
            actor = %request.actor,
            change_id = %change.id,
            action = %action,
            old_limit = change.old_limit,
            new_limit = change.new_limit,
            prorated_amount_cents = change.prorated_amount_cents,
            effective_at = %change.effective_at.to_rfc3339(),
            "Seat plan change recorded"
        );

        self.emit(AuditEvent::for_change(
            kind,
            &change,
            Some(request.actor),
            usage.used,
            now,
        ))
        .await;

        Ok(SeatChangeOutcome {
            change,
            usage_snapshot,
        })
    }

    /// Checks membership, and for writes, an elevated role.
    async fn authorize(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
        elevated: bool,
    ) -> Result<(), SeatBillingError> {
        let role = bounded(
            self.settings.storage_timeout,
            self.roles.role(organization_id, actor),
        )
        .await?;

        let allowed = match role {
            Some(role) => !elevated || role.can_manage_billing(),
            None => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(SeatBillingError::Forbidden {
                actor,
                organization_id,
                operation: if elevated {
                    "change the seat plan"
                } else {
                    "view billing"
                },
            })
        }
    }

    async fn emit(&self, event: AuditEvent) {
        let kind = event.kind.as_str();
        let organization_id = event.organization_id;
        if let Err(err) = bounded(self.settings.storage_timeout, self.audit.record(event)).await {
            warn!(
                organization_id = %organization_id,
                event = kind,
                error = %err,
                "Failed to record audit event"
            );
        }
    }

    fn cycle_for(plan: &SeatPlan, now: DateTime<Utc>) -> Result<BillingCycle, SeatBillingError> {
        Ok(BillingCycleCalculator::compute_cycle(
            plan.billing_cycle_anchor,
            plan.billing_cycle_interval,
            now,
        )?)
    }
}

/// Maps a uniqueness violation to the pending downgrade conflict.
fn downgrade_conflict(err: StoreError) -> SeatBillingError {
    match err {
        StoreError::Conflict(_) => {
            SeatBillingError::Conflict(ChangeRejection::DowngradeAlreadyScheduled)
        }
        other => SeatBillingError::Storage(other),
    }
}

fn change_metadata(cycle: &BillingCycle, usage: &SeatUsageSnapshot) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("cycle_start".into(), json!(cycle.start.to_rfc3339()));
    metadata.insert("cycle_end".into(), json!(cycle.end.to_rfc3339()));
    metadata.insert("seats_used".into(), json!(usage.used));
    metadata
}

fn log_failure(
    action: ChangeAction,
    organization_id: OrganizationId,
    actor: UserId,
    err: &SeatBillingError,
) {
    if err.is_internal() {
        error!(
            organization_id = %organization_id,
            actor = %actor,
            action = %action,
            error = %err,
            "Seat plan change failed"
        );
    } else {
        warn!(
            organization_id = %organization_id,
            actor = %actor,
            action = %action,
            code = err.error_code(),
            reason = %err,
            "Seat plan change rejected"
        );
    }
}
