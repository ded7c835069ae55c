//! `SeaORM` Entity for seat_plans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{BillingInterval, SeatPlanStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "seat_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub organization_id: Uuid,
    pub seat_limit: i32,
    pub billing_cycle_anchor: DateTimeWithTimeZone,
    pub billing_cycle_interval: BillingInterval,
    pub status: SeatPlanStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::seat_plan_changes::Entity")]
    SeatPlanChanges,
}

impl Related<super::seat_plan_changes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatPlanChanges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
