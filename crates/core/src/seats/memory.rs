//! In-memory storage for tests and single-process deployments.
//!
//! Every organization owns one `tokio::sync::Mutex`. A unit of work holds the
//! owned guard for its whole lifetime and edits a private copy of the state,
//! which replaces the guarded state on commit.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use roster_shared::types::{OrganizationId, SeatPlanChangeId, UserId};

use super::error::StoreError;
use super::store::{RoleResolver, SeatPlanStore, SeatPlanUnitOfWork, SeatUsageReader};
use super::types::{ChangeStatus, MemberRole, SeatPlan, SeatPlanChange, SeatUsageSnapshot};

#[derive(Debug, Clone, Default)]
struct OrgState {
    plan: Option<SeatPlan>,
    changes: Vec<SeatPlanChange>,
    members: HashMap<UserId, MemberRole>,
    used: u32,
}

impl OrgState {
    fn scheduled_downgrade(&self) -> Option<&SeatPlanChange> {
        self.changes.iter().find(|c| c.is_pending_downgrade())
    }
}

/// Seat plan storage backed by process memory.
#[derive(Debug, Default)]
pub struct InMemorySeatStore {
    orgs: DashMap<OrganizationId, Arc<Mutex<OrgState>>>,
    unavailable: AtomicBool,
    fail_commits: AtomicBool,
    latency: std::sync::RwLock<Option<Duration>>,
}

impl InMemorySeatStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, organization_id: OrganizationId) -> Arc<Mutex<OrgState>> {
        Arc::clone(self.orgs.entry(organization_id).or_default().value())
    }

    fn existing(&self, organization_id: OrganizationId) -> Option<Arc<Mutex<OrgState>>> {
        self.orgs
            .get(&organization_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    async fn check_available(&self) -> Result<(), StoreError> {
        let latency = *self
            .latency
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }

    /// Creates or replaces an organization's plan.
    pub async fn insert_plan(&self, plan: SeatPlan) {
        let slot = self.slot(plan.organization_id);
        slot.lock().await.plan = Some(plan);
    }

    /// Sets the number of seat-consuming members.
    pub async fn set_used(&self, organization_id: OrganizationId, used: u32) {
        self.slot(organization_id).lock().await.used = used;
    }

    /// Registers a member with a role.
    pub async fn add_member(&self, organization_id: OrganizationId, user: UserId, role: MemberRole) {
        self.slot(organization_id)
            .lock()
            .await
            .members
            .insert(user, role);
    }

    /// Simulates loss of the backing store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every commit fail, discarding staged writes.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Delays every storage call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .latency
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = latency;
    }

    /// Every change row for an organization, oldest first.
    pub async fn changes(&self, organization_id: OrganizationId) -> Vec<SeatPlanChange> {
        match self.existing(organization_id) {
            Some(slot) => slot.lock().await.changes.clone(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl SeatPlanStore for InMemorySeatStore {
    async fn begin(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Box<dyn SeatPlanUnitOfWork>, StoreError> {
        self.check_available().await?;
        let guard = self.slot(organization_id).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }

    async fn find_plan(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<SeatPlan>, StoreError> {
        self.check_available().await?;
        Ok(match self.existing(organization_id) {
            Some(slot) => slot.lock().await.plan.clone(),
            None => None,
        })
    }

    async fn scheduled_downgrade(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<SeatPlanChange>, StoreError> {
        self.check_available().await?;
        Ok(match self.existing(organization_id) {
            Some(slot) => slot.lock().await.scheduled_downgrade().cloned(),
            None => None,
        })
    }

    async fn recent_changes(
        &self,
        organization_id: OrganizationId,
        limit: u64,
    ) -> Result<Vec<SeatPlanChange>, StoreError> {
        self.check_available().await?;
        let Some(slot) = self.existing(organization_id) else {
            return Ok(Vec::new());
        };
        let state = slot.lock().await;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows = state.changes.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn due_downgrades(&self, now: DateTime<Utc>) -> Result<Vec<SeatPlanChange>, StoreError> {
        self.check_available().await?;
        let slots: Vec<_> = self
            .orgs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut due = Vec::new();
        for slot in slots {
            let state = slot.lock().await;
            due.extend(
                state
                    .changes
                    .iter()
                    .filter(|c| c.is_pending_downgrade() && c.effective_at <= now)
                    .cloned(),
            );
        }
        due.sort_by_key(|c| c.effective_at);
        Ok(due)
    }
}

#[async_trait]
impl SeatUsageReader for InMemorySeatStore {
    async fn usage(&self, organization_id: OrganizationId) -> Result<SeatUsageSnapshot, StoreError> {
        self.check_available().await?;
        Ok(match self.existing(organization_id) {
            Some(slot) => {
                let state = slot.lock().await;
                let limit = state.plan.as_ref().map_or(0, |p| p.seat_limit);
                SeatUsageSnapshot::new(state.used, limit)
            }
            None => SeatUsageSnapshot::new(0, 0),
        })
    }
}

#[async_trait]
impl RoleResolver for InMemorySeatStore {
    async fn role(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<Option<MemberRole>, StoreError> {
        self.check_available().await?;
        Ok(match self.existing(organization_id) {
            Some(slot) => slot.lock().await.members.get(&actor).copied(),
            None => None,
        })
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<OrgState>,
    working: OrgState,
    fail_commit: bool,
}

#[async_trait]
impl SeatPlanUnitOfWork for InMemoryUnitOfWork {
    async fn plan(&mut self) -> Result<Option<SeatPlan>, StoreError> {
        Ok(self.working.plan.clone())
    }

    async fn scheduled_downgrade(&mut self) -> Result<Option<SeatPlanChange>, StoreError> {
        Ok(self.working.scheduled_downgrade().cloned())
    }

    async fn change(
        &mut self,
        change_id: SeatPlanChangeId,
    ) -> Result<Option<SeatPlanChange>, StoreError> {
        Ok(self.working.changes.iter().find(|c| c.id == change_id).cloned())
    }

    async fn set_seat_limit(&mut self, seat_limit: u32) -> Result<(), StoreError> {
        let plan = self
            .working
            .plan
            .as_mut()
            .ok_or_else(|| StoreError::Backend("seat plan row missing".to_string()))?;
        plan.seat_limit = seat_limit;
        Ok(())
    }

    async fn insert_change(&mut self, change: &SeatPlanChange) -> Result<(), StoreError> {
        if change.is_pending_downgrade() && self.working.scheduled_downgrade().is_some() {
            return Err(StoreError::Conflict(format!(
                "organization {} already has a scheduled downgrade",
                change.organization_id
            )));
        }
        self.working.changes.push(change.clone());
        Ok(())
    }

    async fn mark_applied(&mut self, change_id: SeatPlanChangeId) -> Result<bool, StoreError> {
        match self
            .working
            .changes
            .iter_mut()
            .find(|c| c.id == change_id && c.status == ChangeStatus::Scheduled)
        {
            Some(change) => {
                change.status = ChangeStatus::Applied;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Backend("commit rejected".to_string()));
        }
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use roster_shared::types::CurrencyCode;

    use crate::seats::types::{BillingInterval, ChangeAction, PlanStatus};

    fn plan(org: OrganizationId, limit: u32) -> SeatPlan {
        SeatPlan {
            organization_id: org,
            seat_limit: limit,
            billing_cycle_anchor: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            billing_cycle_interval: BillingInterval::Monthly,
            status: PlanStatus::Active,
        }
    }

    fn downgrade(org: OrganizationId, new_limit: u32) -> SeatPlanChange {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        SeatPlanChange {
            id: SeatPlanChangeId::new(),
            organization_id: org,
            requested_by: UserId::new(),
            action: ChangeAction::Downgrade,
            status: ChangeStatus::Scheduled,
            old_limit: 8,
            new_limit,
            effective_at: at,
            currency_code: CurrencyCode::parse("USD").unwrap(),
            unit_price_cents: 1000,
            prorated_amount_cents: 0,
            proration_days_total: 30,
            proration_days_remaining: 10,
            notes: None,
            metadata: serde_json::Map::new(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 5)).await;

        let mut uow = store.begin(org).await.unwrap();
        uow.set_seat_limit(8).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(store.find_plan(org).await.unwrap().unwrap().seat_limit, 8);
    }

    #[tokio::test]
    async fn test_drop_discards_staged_writes() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 5)).await;

        {
            let mut uow = store.begin(org).await.unwrap();
            uow.set_seat_limit(8).await.unwrap();
            uow.insert_change(&downgrade(org, 3)).await.unwrap();
        }

        assert_eq!(store.find_plan(org).await.unwrap().unwrap().seat_limit, 5);
        assert!(store.changes(org).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_discards_staged_writes() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 5)).await;
        store.fail_commits(true);

        let mut uow = store.begin(org).await.unwrap();
        uow.set_seat_limit(8).await.unwrap();
        assert!(matches!(uow.commit().await, Err(StoreError::Backend(_))));

        assert_eq!(store.find_plan(org).await.unwrap().unwrap().seat_limit, 5);
    }

    #[tokio::test]
    async fn test_second_scheduled_downgrade_conflicts() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 8)).await;

        let mut uow = store.begin(org).await.unwrap();
        uow.insert_change(&downgrade(org, 6)).await.unwrap();
        let err = uow.insert_change(&downgrade(org, 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mark_applied_only_once() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 8)).await;
        let change = downgrade(org, 6);

        let mut uow = store.begin(org).await.unwrap();
        uow.insert_change(&change).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin(org).await.unwrap();
        assert!(uow.mark_applied(change.id).await.unwrap());
        assert!(!uow.mark_applied(change.id).await.unwrap());
        uow.commit().await.unwrap();

        assert!(store.scheduled_downgrade(org).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_due_downgrades_filters_by_effective_at() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        store.insert_plan(plan(org, 8)).await;
        let change = downgrade(org, 6);

        let mut uow = store.begin(org).await.unwrap();
        uow.insert_change(&change).await.unwrap();
        uow.commit().await.unwrap();

        let before = Utc.with_ymd_and_hms(2025, 4, 30, 23, 59, 59).unwrap();
        assert!(store.due_downgrades(before).await.unwrap().is_empty());
        let due = store.due_downgrades(change.effective_at).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, change.id);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_fast() {
        let store = InMemorySeatStore::new();
        store.set_unavailable(true);
        let err = store.find_plan(OrganizationId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_usage_and_roles() {
        let store = InMemorySeatStore::new();
        let org = OrganizationId::new();
        let owner = UserId::new();
        store.insert_plan(plan(org, 8)).await;
        store.set_used(org, 6).await;
        store.add_member(org, owner, MemberRole::Owner).await;

        assert_eq!(store.usage(org).await.unwrap(), SeatUsageSnapshot::new(6, 8));
        assert_eq!(store.role(org, owner).await.unwrap(), Some(MemberRole::Owner));
        assert_eq!(store.role(org, UserId::new()).await.unwrap(), None);
    }
}
