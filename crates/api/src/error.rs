//! Error responses.
//!
//! Every failure leaves the API as `{ "ok": false, "code", "message" }`, plus
//! `reason` for validation errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use roster_core::seats::SeatBillingError;
use roster_shared::AppError;

/// Application error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// A malformed request that never reached the billing engine.
    pub fn bad_request(reason: &'static str, message: impl Into<String>) -> Self {
        Self(AppError::Validation {
            reason,
            message: message.into(),
        })
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<SeatBillingError> for ApiError {
    fn from(err: SeatBillingError) -> Self {
        Self(AppError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut body = json!({
            "ok": false,
            "code": self.0.error_code(),
            "message": self.0.client_message(),
        });
        if let Some(reason) = self.0.reason() {
            body["reason"] = json!(reason);
        }

        (status, Json(body)).into_response()
    }
}
