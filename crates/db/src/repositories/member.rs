//! Member directory reads: broker seat usage and role lookup.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use roster_core::seats::{MemberRole, RoleResolver, SeatUsageReader, SeatUsageSnapshot, StoreError};
use roster_shared::types::{OrganizationId, UserId};

use super::mapping::store_error;
use crate::entities::{organization_members, sea_orm_active_enums, seat_plans};

/// Read-only access to `organization_members`.
#[derive(Debug, Clone)]
pub struct MemberRepository {
    db: DatabaseConnection,
}

impl MemberRepository {
    /// Creates a new member repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Counts active brokers in the organization.
    pub async fn active_brokers(&self, organization_id: OrganizationId) -> Result<u32, StoreError> {
        let count = organization_members::Entity::find()
            .filter(organization_members::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(organization_members::Column::Role.eq(sea_orm_active_enums::MemberRole::Broker))
            .filter(organization_members::Column::IsActive.eq(true))
            .count(&self.db)
            .await
            .map_err(store_error)?;

        u32::try_from(count)
            .map_err(|_| StoreError::Backend(format!("broker count out of range: {count}")))
    }
}

#[async_trait]
impl SeatUsageReader for MemberRepository {
    async fn usage(&self, organization_id: OrganizationId) -> Result<SeatUsageSnapshot, StoreError> {
        let used = self.active_brokers(organization_id).await?;
        let seat_limit = seat_plans::Entity::find_by_id(organization_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map_or(0, |plan| u32::try_from(plan.seat_limit).unwrap_or(0));

        Ok(SeatUsageSnapshot::new(used, seat_limit))
    }
}

#[async_trait]
impl RoleResolver for MemberRepository {
    async fn role(
        &self,
        organization_id: OrganizationId,
        actor: UserId,
    ) -> Result<Option<MemberRole>, StoreError> {
        let member = organization_members::Entity::find_by_id((
            organization_id.into_inner(),
            actor.into_inner(),
        ))
        .one(&self.db)
        .await
        .map_err(store_error)?;

        Ok(member
            .filter(|m| m.is_active)
            .map(|m| MemberRole::from(m.role)))
    }
}
