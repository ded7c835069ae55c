//! Storage and collaborator traits for the seat engine.
//!
//! The engine never talks to a database directly. Persistence goes through
//! [`SeatPlanStore`], which hands out a per-organization [`SeatPlanUnitOfWork`]
//! holding the organization's serialization lock until it is committed or
//! dropped. Dropping a unit of work without committing discards every staged
//! write.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roster_shared::types::{OrganizationId, SeatPlanChangeId, UserId};

use super::error::StoreError;
use super::types::{AuditEvent, MemberRole, SeatPlan, SeatPlanChange, SeatUsageSnapshot};

/// Durable storage for seat plans and their change history.
#[async_trait]
pub trait SeatPlanStore: Send + Sync {
    /// Opens a unit of work serialized on `organization_id`.
    ///
    /// Blocks until any other unit of work for the same organization finishes.
    async fn begin(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Box<dyn SeatPlanUnitOfWork>, StoreError>;

    /// Reads the plan without locking.
    async fn find_plan(&self, organization_id: OrganizationId)
    -> Result<Option<SeatPlan>, StoreError>;

    /// Reads the pending downgrade without locking.
    async fn scheduled_downgrade(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<SeatPlanChange>, StoreError>;

    /// Most recent history rows, newest first.
    async fn recent_changes(
        &self,
        organization_id: OrganizationId,
        limit: u64,
    ) -> Result<Vec<SeatPlanChange>, StoreError>;

    /// Scheduled downgrades with `effective_at <= now`, oldest first.
    async fn due_downgrades(&self, now: DateTime<Utc>) -> Result<Vec<SeatPlanChange>, StoreError>;
}

/// Locked read-modify-write access to one organization's billing rows.
#[async_trait]
pub trait SeatPlanUnitOfWork: Send {
    /// Reads the plan under the lock.
    async fn plan(&mut self) -> Result<Option<SeatPlan>, StoreError>;

    /// Reads the pending downgrade under the lock.
    async fn scheduled_downgrade(&mut self) -> Result<Option<SeatPlanChange>, StoreError>;

    /// Reads one change row under the lock.
    async fn change(
        &mut self,
        change_id: SeatPlanChangeId,
    ) -> Result<Option<SeatPlanChange>, StoreError>;

    /// Stages a new live seat limit.
    async fn set_seat_limit(&mut self, seat_limit: u32) -> Result<(), StoreError>;

    /// Stages a new history row.
    ///
    /// Returns `StoreError::Conflict` when a second scheduled downgrade would exist.
    async fn insert_change(&mut self, change: &SeatPlanChange) -> Result<(), StoreError>;

    /// Flips a scheduled row to applied. Returns `false` if the row was not scheduled.
    async fn mark_applied(&mut self, change_id: SeatPlanChangeId) -> Result<bool, StoreError>;

    /// Makes every staged write durable and releases the lock.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Read-only seat usage counter owned by the member directory.
#[async_trait]
pub trait SeatUsageReader: Send + Sync {
    /// Current usage, measured against the plan's live limit.
    async fn usage(&self, organization_id: OrganizationId) -> Result<SeatUsageSnapshot, StoreError>;
}

/// Role lookup owned by the member directory.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// The actor's role in the organization, or `None` if not a member.
    async fn role(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<Option<MemberRole>, StoreError>;
}

/// External audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one event.
    async fn record(&self, event: AuditEvent) -> Result<(), StoreError>;
}

/// Source of "now".
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant, for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    /// Pins the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Moves the clock.
    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self
            .now
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
