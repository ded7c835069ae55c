//! Seat-based subscription billing.
//!
//! Organizations buy a number of broker seats. Owners and managers may raise
//! the limit immediately, paying a prorated charge for the rest of the current
//! cycle, or schedule a decrease that takes effect when the cycle rolls over.
//!
//! # Modules
//!
//! - `types` - Plans, change rows, usage snapshots, cycles and audit events
//! - `cycle` - Calendar-based billing cycle windows
//! - `proration` - Upgrade charge calculation
//! - `validation` - Business rules checked before any transition
//! - `store` - Storage and collaborator traits
//! - `memory` - In-memory storage
//! - `audit` - Audit sinks
//! - `service` - Read, upgrade and downgrade orchestration
//! - `reconciler` - Rollover of scheduled downgrades

pub mod audit;
pub mod cycle;
pub mod error;
pub mod memory;
pub mod proration;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod cycle_props;
#[cfg(test)]
mod proration_props;

pub use audit::{RecordingAuditSink, TracingAuditSink};
pub use cycle::{BillingCycleCalculator, CycleError};
pub use error::{SeatBillingError, StoreError};
pub use memory::InMemorySeatStore;
pub use proration::{ProrationCalculator, ProrationError, ProrationInput, ProrationResult};
pub use reconciler::{CycleRolloverReconciler, ReconcileReport, RolloverOutcome};
pub use service::{SeatBillingService, SeatBillingSettings};
pub use store::{
    AuditSink, Clock, FixedClock, RoleResolver, SeatPlanStore, SeatPlanUnitOfWork,
    SeatUsageReader, SystemClock,
};
pub use types::{
    AuditEvent, AuditEventKind, BillingCycle, BillingInterval, BillingState, ChangeAction,
    ChangeStatus, MemberRole, PlanStatus, SeatChangeOutcome, SeatChangeRequest, SeatPlan,
    SeatPlanChange, SeatUsageSnapshot,
};
pub use validation::{
    ChangeCheck, ChangeRejection, MAX_NOTES_LEN, MAX_SEAT_LIMIT, MAX_UNIT_PRICE_CENTS,
    SeatPlanChangeValidator, ValidatedChange,
};
