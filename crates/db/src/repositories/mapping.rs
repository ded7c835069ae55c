//! Conversions between database rows and seat engine types.

use chrono::Utc;
use sea_orm::{DbErr, Set, SqlErr};

use roster_core::seats::{
    BillingInterval, ChangeAction, ChangeStatus, MemberRole, PlanStatus, SeatPlan, SeatPlanChange,
    StoreError,
};
use roster_shared::types::{CurrencyCode, OrganizationId, SeatPlanChangeId, UserId};

use crate::entities::{sea_orm_active_enums as db, seat_plan_changes, seat_plans};

/// Maps a database error onto the storage error taxonomy.
///
/// Unique violations become `Conflict`; pool and connection failures become
/// `Unavailable`; everything else is `Backend`.
pub fn store_error(err: DbErr) -> StoreError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return StoreError::Conflict(err.to_string());
    }
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::Unavailable(err.to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("{column} out of range: {value}")))
}

impl From<db::BillingInterval> for BillingInterval {
    fn from(value: db::BillingInterval) -> Self {
        match value {
            db::BillingInterval::Monthly => Self::Monthly,
            db::BillingInterval::Yearly => Self::Yearly,
        }
    }
}

impl From<BillingInterval> for db::BillingInterval {
    fn from(value: BillingInterval) -> Self {
        match value {
            BillingInterval::Monthly => Self::Monthly,
            BillingInterval::Yearly => Self::Yearly,
        }
    }
}

impl From<db::SeatPlanStatus> for PlanStatus {
    fn from(value: db::SeatPlanStatus) -> Self {
        match value {
            db::SeatPlanStatus::Active => Self::Active,
            db::SeatPlanStatus::Inactive => Self::Inactive,
        }
    }
}

impl From<PlanStatus> for db::SeatPlanStatus {
    fn from(value: PlanStatus) -> Self {
        match value {
            PlanStatus::Active => Self::Active,
            PlanStatus::Inactive => Self::Inactive,
        }
    }
}

impl From<db::SeatChangeAction> for ChangeAction {
    fn from(value: db::SeatChangeAction) -> Self {
        match value {
            db::SeatChangeAction::Upgrade => Self::Upgrade,
            db::SeatChangeAction::Downgrade => Self::Downgrade,
        }
    }
}

impl From<ChangeAction> for db::SeatChangeAction {
    fn from(value: ChangeAction) -> Self {
        match value {
            ChangeAction::Upgrade => Self::Upgrade,
            ChangeAction::Downgrade => Self::Downgrade,
        }
    }
}

impl From<db::SeatChangeStatus> for ChangeStatus {
    fn from(value: db::SeatChangeStatus) -> Self {
        match value {
            db::SeatChangeStatus::Scheduled => Self::Scheduled,
            db::SeatChangeStatus::Applied => Self::Applied,
        }
    }
}

impl From<ChangeStatus> for db::SeatChangeStatus {
    fn from(value: ChangeStatus) -> Self {
        match value {
            ChangeStatus::Scheduled => Self::Scheduled,
            ChangeStatus::Applied => Self::Applied,
        }
    }
}

impl From<db::MemberRole> for MemberRole {
    fn from(value: db::MemberRole) -> Self {
        match value {
            db::MemberRole::Owner => Self::Owner,
            db::MemberRole::Manager => Self::Manager,
            db::MemberRole::Broker => Self::Broker,
            db::MemberRole::Assistant => Self::Assistant,
        }
    }
}

impl From<MemberRole> for db::MemberRole {
    fn from(value: MemberRole) -> Self {
        match value {
            MemberRole::Owner => Self::Owner,
            MemberRole::Manager => Self::Manager,
            MemberRole::Broker => Self::Broker,
            MemberRole::Assistant => Self::Assistant,
        }
    }
}

/// Converts a `seat_plans` row.
pub fn plan_from_model(model: &seat_plans::Model) -> Result<SeatPlan, StoreError> {
    Ok(SeatPlan {
        organization_id: OrganizationId::from_uuid(model.organization_id),
        seat_limit: to_u32(model.seat_limit, "seat_limit")?,
        billing_cycle_anchor: model.billing_cycle_anchor.with_timezone(&Utc),
        billing_cycle_interval: model.billing_cycle_interval.into(),
        status: model.status.into(),
    })
}

/// Converts a `seat_plan_changes` row.
pub fn change_from_model(model: seat_plan_changes::Model) -> Result<SeatPlanChange, StoreError> {
    let currency_code = CurrencyCode::parse(&model.currency_code)
        .map_err(|e| StoreError::Backend(e.to_string()))?;
    let metadata = match model.metadata {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };

    Ok(SeatPlanChange {
        id: SeatPlanChangeId::from_uuid(model.id),
        organization_id: OrganizationId::from_uuid(model.organization_id),
        requested_by: UserId::from_uuid(model.requested_by),
        action: model.action.into(),
        status: model.status.into(),
        old_limit: to_u32(model.old_limit, "old_limit")?,
        new_limit: to_u32(model.new_limit, "new_limit")?,
        effective_at: model.effective_at.with_timezone(&Utc),
        currency_code,
        unit_price_cents: model.unit_price_cents,
        prorated_amount_cents: model.prorated_amount_cents,
        proration_days_total: to_u32(model.proration_days_total, "proration_days_total")?,
        proration_days_remaining: to_u32(
            model.proration_days_remaining,
            "proration_days_remaining",
        )?,
        notes: model.notes,
        metadata,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

/// Builds the insert model for a new change row.
pub fn change_to_active(change: &SeatPlanChange) -> Result<seat_plan_changes::ActiveModel, StoreError> {
    Ok(seat_plan_changes::ActiveModel {
        id: Set(change.id.into_inner()),
        organization_id: Set(change.organization_id.into_inner()),
        requested_by: Set(change.requested_by.into_inner()),
        action: Set(change.action.into()),
        status: Set(change.status.into()),
        old_limit: Set(to_i32(change.old_limit, "old_limit")?),
        new_limit: Set(to_i32(change.new_limit, "new_limit")?),
        effective_at: Set(change.effective_at.into()),
        currency_code: Set(change.currency_code.as_str().to_string()),
        unit_price_cents: Set(change.unit_price_cents),
        prorated_amount_cents: Set(change.prorated_amount_cents),
        proration_days_total: Set(to_i32(change.proration_days_total, "proration_days_total")?),
        proration_days_remaining: Set(to_i32(
            change.proration_days_remaining,
            "proration_days_remaining",
        )?),
        notes: Set(change.notes.clone()),
        metadata: Set(serde_json::Value::Object(change.metadata.clone())),
        created_at: Set(change.created_at.into()),
    })
}

/// Seat limit as stored.
pub fn seat_limit_column(seat_limit: u32) -> Result<i32, StoreError> {
    to_i32(seat_limit, "seat_limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{ConnAcquireErr, RuntimeErr};
    use uuid::Uuid;

    fn row() -> seat_plan_changes::Model {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 1, 0, 0, 0)
            .unwrap();
        seat_plan_changes::Model {
            id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            requested_by: Uuid::now_v7(),
            action: db::SeatChangeAction::Downgrade,
            status: db::SeatChangeStatus::Scheduled,
            old_limit: 8,
            new_limit: 6,
            effective_at: at,
            currency_code: "USD".to_string(),
            unit_price_cents: 1000,
            prorated_amount_cents: 0,
            proration_days_total: 30,
            proration_days_remaining: 10,
            notes: Some("season end".to_string()),
            metadata: serde_json::json!({ "seats_used": 6 }),
            created_at: at,
        }
    }

    #[test]
    fn test_change_row_converts() {
        let change = change_from_model(row()).unwrap();
        assert!(change.is_pending_downgrade());
        assert_eq!(change.new_limit, 6);
        assert_eq!(change.currency_code.as_str(), "USD");
        assert_eq!(change.metadata.get("seats_used"), Some(&serde_json::json!(6)));
        assert_eq!(change.effective_at, Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_negative_column_rejected() {
        let mut bad = row();
        bad.proration_days_remaining = -1;
        assert!(matches!(change_from_model(bad), Err(StoreError::Backend(_))));
    }

    #[test]
    fn test_non_object_metadata_becomes_empty() {
        let mut odd = row();
        odd.metadata = serde_json::Value::Null;
        assert!(change_from_model(odd).unwrap().metadata.is_empty());
    }

    #[test]
    fn test_active_model_carries_every_column() {
        let change = change_from_model(row()).unwrap();
        let active = change_to_active(&change).unwrap();
        assert_eq!(active.id, Set(change.id.into_inner()));
        assert_eq!(active.action, Set(db::SeatChangeAction::Downgrade));
        assert_eq!(active.new_limit, Set(6));
        assert_eq!(active.currency_code, Set("USD".to_string()));
    }

    #[test]
    fn test_seat_limit_overflow_rejected() {
        assert!(seat_limit_column(u32::MAX).is_err());
        assert_eq!(seat_limit_column(1_000_000).unwrap(), 1_000_000);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            store_error(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(DbErr::Conn(RuntimeErr::Internal("reset".into()))),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store_error(DbErr::Custom("boom".into())),
            StoreError::Backend(_)
        ));
    }
}
