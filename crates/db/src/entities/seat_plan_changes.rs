//! `SeaORM` Entity for seat_plan_changes table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{SeatChangeAction, SeatChangeStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "seat_plan_changes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub requested_by: Uuid,
    pub action: SeatChangeAction,
    pub status: SeatChangeStatus,
    pub old_limit: i32,
    pub new_limit: i32,
    pub effective_at: DateTimeWithTimeZone,
    pub currency_code: String,
    pub unit_price_cents: i64,
    pub prorated_amount_cents: i64,
    pub proration_days_total: i32,
    pub proration_days_remaining: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seat_plans::Entity",
        from = "Column::OrganizationId",
        to = "super::seat_plans::Column::OrganizationId"
    )]
    SeatPlans,
}

impl Related<super::seat_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatPlans.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
