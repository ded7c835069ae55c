//! Applies scheduled downgrades once their cycle has rolled over.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use roster_shared::types::{OrganizationId, SeatPlanChangeId};

use super::error::SeatBillingError;
use super::service::{SeatBillingSettings, bounded};
use super::store::{AuditSink, Clock, SeatPlanStore, SeatUsageReader, SystemClock};
use super::types::{AuditEvent, AuditEventKind};

/// What happened to one due downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloverOutcome {
    /// Limit lowered; usage fits.
    Applied,
    /// Limit lowered although usage exceeds it; flagged for manual seat reduction.
    AppliedOverUsage,
    /// Nothing to do: already applied or not yet due.
    Skipped,
}

/// Summary of one reconciler pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Downgrades applied with usage within the new limit.
    pub applied: u32,
    /// Downgrades applied with usage above the new limit.
    pub applied_over_usage: u32,
    /// Rows that needed no work.
    pub skipped: u32,
    /// Rows that failed; retried on the next pass.
    pub failed: u32,
}

impl ReconcileReport {
    fn record(&mut self, outcome: RolloverOutcome) {
        match outcome {
            RolloverOutcome::Applied => self.applied += 1,
            RolloverOutcome::AppliedOverUsage => self.applied_over_usage += 1,
            RolloverOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Flips due scheduled downgrades to applied and lowers the live limit.
pub struct CycleRolloverReconciler {
    store: Arc<dyn SeatPlanStore>,
    usage: Arc<dyn SeatUsageReader>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    settings: SeatBillingSettings,
}

impl CycleRolloverReconciler {
    /// Creates a reconciler using the wall clock and default settings.
    pub fn new(
        store: Arc<dyn SeatPlanStore>,
        usage: Arc<dyn SeatUsageReader>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            usage,
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

    /// Applies every downgrade due at the current instant.
    ///
    /// A failure on one organization is logged and counted; the pass continues.
    ///
    /// # Errors
    ///
    /// Fails only if the list of due downgrades cannot be read.
    pub async fn run_once(&self) -> Result<ReconcileReport, SeatBillingError> {
        let now = self.clock.now();
        let due = bounded(self.settings.storage_timeout, self.store.due_downgrades(now)).await?;

        let mut report = ReconcileReport::default();
        for change in due {
            match self.apply_due(change.organization_id, change.id, now).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!(
                        organization_id = %change.organization_id,
                        change_id = %change.id,
                        error = %err,
                        "Failed to apply scheduled downgrade"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            applied = report.applied,
            applied_over_usage = report.applied_over_usage,
            skipped = report.skipped,
            failed = report.failed,
            "Seat rollover pass finished"
        );
        Ok(report)
    }

    /// Applies one scheduled downgrade if it is still pending and due at `now`.
    ///
    /// Calling this again for the same row is a no-op returning `Skipped`.
    pub async fn apply_due(
        &self,
        organization_id: OrganizationId,
        change_id: SeatPlanChangeId,
        now: DateTime<Utc>,
    ) -> Result<RolloverOutcome, SeatBillingError> {
        let limit = self.settings.storage_timeout;
        let usage = bounded(limit, self.usage.usage(organization_id)).await?;

        let mut uow = bounded(limit, self.store.begin(organization_id)).await?;
        let change = bounded(limit, uow.change(change_id))
            .await?
            .ok_or(SeatBillingError::ChangeNotFound(change_id))?;
        if !change.is_pending_downgrade() || change.effective_at > now {
            return Ok(RolloverOutcome::Skipped);
        }
        let live_limit = bounded(limit, uow.plan())
            .await?
            .ok_or(SeatBillingError::PlanNotFound(organization_id))?
            .seat_limit;

        if !bounded(limit, uow.mark_applied(change_id)).await? {
            return Ok(RolloverOutcome::Skipped);
        }
        bounded(limit, uow.set_seat_limit(change.new_limit)).await?;
        bounded(limit, uow.commit()).await?;

        if live_limit != change.old_limit {
            warn!(
                organization_id = %organization_id,
                change_id = %change_id,
                scheduled_from = change.old_limit,
                live_limit,
                new_limit = change.new_limit,
                "Seat limit changed after the downgrade was scheduled"
            );
        }

        let over_usage = usage.used > change.new_limit;
        let (kind, outcome) = if over_usage {
            warn!(
                organization_id = %organization_id,
                change_id = %change_id,
                seats_used = usage.used,
                new_limit = change.new_limit,
                "Downgrade applied while usage exceeds the new limit; manual seat reduction required"
            );
            (
                AuditEventKind::SeatDowngradeAppliedOverUsage,
                RolloverOutcome::AppliedOverUsage,
            )
        } else {
            info!(
                organization_id = %organization_id,
                change_id = %change_id,
                old_limit = live_limit,
                new_limit = change.new_limit,
                "Scheduled downgrade applied"
            );
            (AuditEventKind::SeatDowngradeApplied, RolloverOutcome::Applied)
        };

        // The live limit may have been raised since scheduling.
        let mut event = AuditEvent::for_change(kind, &change, None, usage.used, now);
        event.old_limit = live_limit;
        if let Err(err) = bounded(limit, self.audit.record(event)).await {
            warn!(
                organization_id = %organization_id,
                event = kind.as_str(),
                error = %err,
                "Failed to record audit event"
            );
        }

        Ok(outcome)
    }
}
