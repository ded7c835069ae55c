//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
///
/// Every variant maps onto one of the three things an operator-facing UI needs
/// to tell apart: fix the input and resubmit (`Validation`, `Conflict`), try
/// again later (`Storage`, `Unavailable`), or not allowed (`Unauthorized`,
/// `Forbidden`).
#[derive(Debug, Error)]
pub enum AppError {
    /// No identity on the request.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Identity present but lacks the required role.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input.
    #[error("Validation error: {message}")]
    Validation {
        /// Machine-readable sub-reason (e.g. `invalid_upgrade_target`).
        reason: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Request conflicts with current persisted state.
    #[error("Conflict: {message}")]
    Conflict {
        /// Machine-readable conflict code (e.g. `downgrade_already_scheduled`).
        code: &'static str,
        /// Human-readable message.
        message: String,
    },

    /// Durable storage rejected or failed an operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Durable storage could not be reached in time.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::Storage(_) | Self::Internal(_) => 500,
            Self::Unavailable(_) => 503,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::Conflict { code, .. } => code,
            Self::Storage(_) => "storage_error",
            Self::Unavailable(_) => "storage_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns the message safe to show to the caller.
    ///
    /// Storage and internal failures never leak backend text.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Internal(_) => "An error occurred".to_string(),
            Self::Unavailable(_) => {
                "Billing storage is temporarily unavailable; refresh and try again".to_string()
            }
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Validation { message, .. } | Self::Conflict { message, .. } => message.clone(),
        }
    }

    /// Returns the validation sub-reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Validation { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
