//! Repository implementations of the seat engine's storage traits.
//!
//! Repositories hide the `SeaORM` details from the rest of the application;
//! callers only see the traits defined in `roster_core::seats::store`.

pub mod mapping;
pub mod member;
pub mod seat_plan;

pub use mapping::store_error;
pub use member::MemberRepository;
pub use seat_plan::{SeatPlanRepository, SeatPlanTransaction};
