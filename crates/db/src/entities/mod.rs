//! `SeaORM` entity definitions for the seat billing tables.

pub mod organization_members;
pub mod sea_orm_active_enums;
pub mod seat_plan_changes;
pub mod seat_plans;
