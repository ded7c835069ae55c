//! Seat plan repository backed by Postgres.
//!
//! A unit of work is a database transaction that starts by taking a
//! `SELECT ... FOR UPDATE` lock on the organization's `seat_plans` row. Every
//! read and write for that organization happens inside the transaction, so two
//! concurrent changes for the same organization run one after the other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use roster_core::seats::{
    SeatPlan, SeatPlanChange, SeatPlanStore, SeatPlanUnitOfWork, StoreError,
};
use roster_shared::types::{OrganizationId, SeatPlanChangeId};

use super::mapping::{
    change_from_model, change_to_active, plan_from_model, seat_limit_column, store_error,
};
use crate::entities::{
    sea_orm_active_enums::{SeatChangeAction, SeatChangeStatus},
    seat_plan_changes, seat_plans,
};

/// Seat plan repository.
#[derive(Debug, Clone)]
pub struct SeatPlanRepository {
    db: DatabaseConnection,
}

impl SeatPlanRepository {
    /// Creates a new seat plan repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SeatPlanStore for SeatPlanRepository {
    async fn begin(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Box<dyn SeatPlanUnitOfWork>, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        let plan = seat_plans::Entity::find_by_id(organization_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(store_error)?;

        debug!(organization_id = %organization_id, locked = plan.is_some(), "Seat plan transaction opened");

        Ok(Box::new(SeatPlanTransaction {
            txn,
            organization_id,
            plan,
        }))
    }

    async fn find_plan(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<SeatPlan>, StoreError> {
        seat_plans::Entity::find_by_id(organization_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .as_ref()
            .map(plan_from_model)
            .transpose()
    }

    async fn scheduled_downgrade(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<SeatPlanChange>, StoreError> {
        pending_downgrade_query(organization_id)
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(change_from_model)
            .transpose()
    }

    async fn recent_changes(
        &self,
        organization_id: OrganizationId,
        limit: u64,
    ) -> Result<Vec<SeatPlanChange>, StoreError> {
        seat_plan_changes::Entity::find()
            .filter(seat_plan_changes::Column::OrganizationId.eq(organization_id.into_inner()))
            .order_by_desc(seat_plan_changes::Column::CreatedAt)
            .order_by_desc(seat_plan_changes::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(change_from_model)
            .collect()
    }

    async fn due_downgrades(&self, now: DateTime<Utc>) -> Result<Vec<SeatPlanChange>, StoreError> {
        seat_plan_changes::Entity::find()
            .filter(seat_plan_changes::Column::Action.eq(SeatChangeAction::Downgrade))
            .filter(seat_plan_changes::Column::Status.eq(SeatChangeStatus::Scheduled))
            .filter(seat_plan_changes::Column::EffectiveAt.lte(now))
            .order_by_asc(seat_plan_changes::Column::EffectiveAt)
            .order_by_asc(seat_plan_changes::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(change_from_model)
            .collect()
    }
}

fn pending_downgrade_query(organization_id: OrganizationId) -> sea_orm::Select<seat_plan_changes::Entity> {
    seat_plan_changes::Entity::find()
        .filter(seat_plan_changes::Column::OrganizationId.eq(organization_id.into_inner()))
        .filter(seat_plan_changes::Column::Action.eq(SeatChangeAction::Downgrade))
        .filter(seat_plan_changes::Column::Status.eq(SeatChangeStatus::Scheduled))
}

/// Open transaction holding the organization's plan row lock.
///
/// Dropping it without calling `commit` rolls back.
pub struct SeatPlanTransaction {
    txn: DatabaseTransaction,
    organization_id: OrganizationId,
    plan: Option<seat_plans::Model>,
}

#[async_trait]
impl SeatPlanUnitOfWork for SeatPlanTransaction {
    async fn plan(&mut self) -> Result<Option<SeatPlan>, StoreError> {
        self.plan.as_ref().map(plan_from_model).transpose()
    }

    async fn scheduled_downgrade(&mut self) -> Result<Option<SeatPlanChange>, StoreError> {
        pending_downgrade_query(self.organization_id)
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(change_from_model)
            .transpose()
    }

    async fn change(
        &mut self,
        change_id: SeatPlanChangeId,
    ) -> Result<Option<SeatPlanChange>, StoreError> {
        seat_plan_changes::Entity::find_by_id(change_id.into_inner())
            .filter(seat_plan_changes::Column::OrganizationId.eq(self.organization_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(change_from_model)
            .transpose()
    }

    async fn set_seat_limit(&mut self, seat_limit: u32) -> Result<(), StoreError> {
        let Some(current) = self.plan.take() else {
            return Err(StoreError::Backend(format!(
                "no seat plan for organization {}",
                self.organization_id
            )));
        };

        let mut active = current.into_active_model();
        active.seat_limit = Set(seat_limit_column(seat_limit)?);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.txn).await.map_err(store_error)?;
        self.plan = Some(updated);
        Ok(())
    }

    async fn insert_change(&mut self, change: &SeatPlanChange) -> Result<(), StoreError> {
        change_to_active(change)?
            .insert(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn mark_applied(&mut self, change_id: SeatPlanChangeId) -> Result<bool, StoreError> {
        let row = seat_plan_changes::Entity::find_by_id(change_id.into_inner())
            .filter(seat_plan_changes::Column::OrganizationId.eq(self.organization_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(store_error)?;

        let Some(row) = row else {
            return Ok(false);
        };
        if row.status != SeatChangeStatus::Scheduled {
            return Ok(false);
        }

        let mut active = row.into_active_model();
        active.status = Set(SeatChangeStatus::Applied);
        active.update(&self.txn).await.map_err(store_error)?;
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)
    }
}
