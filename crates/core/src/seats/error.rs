//! Seat billing error types.

use thiserror::Error;

use roster_shared::AppError;
use roster_shared::types::{OrganizationId, SeatPlanChangeId, UserId};

use super::cycle::CycleError;
use super::proration::ProrationError;
use super::validation::ChangeRejection;

/// Errors raised by storage implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Storage could not be reached or did not answer in time.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint was violated.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    /// Any other storage fault.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors from seat billing operations.
#[derive(Debug, Error)]
pub enum SeatBillingError {
    /// No authenticated actor.
    #[error("Authentication required")]
    Unauthenticated,

    /// Actor lacks the role the operation needs.
    #[error("User {actor} may not {operation} for organization {organization_id}")]
    Forbidden {
        /// Actor.
        actor: UserId,
        /// Organization.
        organization_id: OrganizationId,
        /// Operation attempted.
        operation: &'static str,
    },

    /// Request is malformed or asks for an impossible transition.
    #[error("{0}")]
    Validation(ChangeRejection),

    /// Request conflicts with stored state.
    #[error("{0}")]
    Conflict(ChangeRejection),

    /// Organization has no seat plan.
    #[error("No seat plan for organization {0}")]
    PlanNotFound(OrganizationId),

    /// Change row disappeared.
    #[error("Seat plan change {0} not found")]
    ChangeNotFound(SeatPlanChangeId),

    /// Cycle arithmetic failed.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// Proration arithmetic failed.
    #[error(transparent)]
    Proration(#[from] ProrationError),

    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<ChangeRejection> for SeatBillingError {
    fn from(rejection: ChangeRejection) -> Self {
        if rejection.is_conflict() {
            Self::Conflict(rejection)
        } else {
            Self::Validation(rejection)
        }
    }
}

impl SeatBillingError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::PlanNotFound(_) | Self::ChangeNotFound(_) => 404,
            Self::Storage(StoreError::Unavailable(_)) => 503,
            Self::Cycle(_) | Self::Proration(_) | Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Validation(_) => "validation_error",
            Self::Conflict(ChangeRejection::DowngradeBelowActiveUsage { .. }) => {
                "downgrade_below_active_brokers"
            }
            Self::Conflict(rejection) => rejection.code(),
            Self::PlanNotFound(_) | Self::ChangeNotFound(_) => "not_found",
            Self::Storage(StoreError::Unavailable(_)) => "storage_unavailable",
            Self::Cycle(_) | Self::Proration(_) | Self::Storage(_) => "storage_error",
        }
    }

    /// True for faults the caller cannot fix by changing the request.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Cycle(_) | Self::Proration(_) | Self::Storage(_))
    }
}

impl From<SeatBillingError> for AppError {
    fn from(err: SeatBillingError) -> Self {
        let message = err.to_string();
        let code = err.error_code();
        match err {
            SeatBillingError::Unauthenticated => Self::Unauthorized(message),
            SeatBillingError::Forbidden { .. } => Self::Forbidden(message),
            SeatBillingError::Validation(rejection) => Self::Validation {
                reason: rejection.code(),
                message,
            },
            SeatBillingError::Conflict(_) => Self::Conflict { code, message },
            SeatBillingError::PlanNotFound(_) | SeatBillingError::ChangeNotFound(_) => {
                Self::NotFound(message)
            }
            SeatBillingError::Storage(StoreError::Unavailable(_)) => Self::Unavailable(message),
            SeatBillingError::Cycle(_)
            | SeatBillingError::Proration(_)
            | SeatBillingError::Storage(_) => Self::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ChangeRejection::InvalidUpgradeTarget { current: 5, requested: 5 }, 400, "validation_error")]
    #[case(ChangeRejection::InvalidSeatLimit(-1), 400, "validation_error")]
    #[case(ChangeRejection::DowngradeBelowActiveUsage { used: 6, requested: 5 }, 409, "downgrade_below_active_brokers")]
    #[case(ChangeRejection::DowngradeAlreadyScheduled, 409, "downgrade_already_scheduled")]
    #[case(ChangeRejection::PlanInactive, 409, "plan_inactive")]
    fn test_rejection_mapping(
        #[case] rejection: ChangeRejection,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        let err = SeatBillingError::from(rejection);
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_storage_mapping() {
        let unavailable = SeatBillingError::from(StoreError::Unavailable("timeout".into()));
        assert_eq!(unavailable.status_code(), 503);
        assert_eq!(unavailable.error_code(), "storage_unavailable");

        let backend = SeatBillingError::from(StoreError::Backend("boom".into()));
        assert_eq!(backend.status_code(), 500);
        assert_eq!(backend.error_code(), "storage_error");
        assert!(backend.is_internal());
    }

    #[test]
    fn test_app_error_keeps_validation_reason() {
        let app: AppError =
            SeatBillingError::from(ChangeRejection::InvalidCurrency("usd".into())).into();
        assert_eq!(app.status_code(), 400);
        assert_eq!(app.error_code(), "validation_error");
        assert_eq!(app.reason(), Some("invalid_currency"));
    }

    #[test]
    fn test_app_error_conflict_code() {
        let app: AppError = SeatBillingError::from(ChangeRejection::DowngradeBelowActiveUsage {
            used: 6,
            requested: 5,
        })
        .into();
        assert_eq!(app.status_code(), 409);
        assert_eq!(app.error_code(), "downgrade_below_active_brokers");
        assert!(app.client_message().contains('6'));
    }

    #[test]
    fn test_app_error_hides_backend_detail() {
        let app: AppError =
            SeatBillingError::from(StoreError::Backend("relation does not exist".into())).into();
        assert_eq!(app.error_code(), "storage_error");
        assert!(!app.client_message().contains("relation"));
    }

    #[test]
    fn test_forbidden_mapping() {
        let app: AppError = SeatBillingError::Forbidden {
            actor: UserId::new(),
            organization_id: OrganizationId::new(),
            operation: "change seats",
        }
        .into();
        assert_eq!(app.status_code(), 403);
        assert_eq!(app.error_code(), "forbidden");
    }
}
