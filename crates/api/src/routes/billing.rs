//! Seat billing routes.
//!
//! All routes sit behind the auth middleware. Role checks happen inside the
//! billing service, which knows the organization's member directory.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roster_core::seats::{
    BillingCycle, BillingState, ChangeAction, SeatChangeOutcome, SeatChangeRequest, SeatPlan,
    SeatPlanChange, SeatUsageSnapshot,
};
use roster_shared::types::OrganizationId;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the seat billing router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/billing/seats",
            get(get_seat_billing),
        )
        .route(
            "/organizations/{org_id}/billing/seats/changes",
            post(create_seat_change),
        )
        .route(
            "/organizations/{org_id}/billing/seats/cycle",
            get(get_current_cycle),
        )
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body of `POST .../billing/seats/changes`.
#[derive(Debug, Deserialize)]
pub struct SeatChangeBody {
    /// `upgrade` or `downgrade`.
    pub action: ChangeAction,
    /// Requested seat limit.
    pub new_limit: i64,
    /// Price of one seat for a full cycle, in minor units.
    pub unit_price_cents: i64,
    /// ISO 4217 code.
    pub currency_code: String,
    /// Free-form operator notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Billing state as returned to the settings screen.
#[derive(Debug, Serialize)]
pub struct SeatBillingResponse {
    /// Current plan.
    pub plan: SeatPlan,
    /// Seats used against the live limit.
    pub usage: SeatUsageSnapshot,
    /// Cycle containing now.
    pub cycle: BillingCycle,
    /// Scheduled downgrade, if any.
    pub pending_change: Option<SeatPlanChange>,
    /// Recent changes, newest first.
    pub history: Vec<SeatPlanChange>,
}

impl From<BillingState> for SeatBillingResponse {
    fn from(state: BillingState) -> Self {
        Self {
            plan: state.plan,
            usage: state.usage,
            cycle: state.cycle,
            pending_change: state.pending_downgrade,
            history: state.history,
        }
    }
}

/// How a successful change took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMode {
    /// Limit raised immediately.
    UpgradeApplied,
    /// Limit lowers at the end of the cycle.
    DowngradeScheduled,
}

/// Successful change response.
#[derive(Debug, Serialize)]
pub struct SeatChangeResponse {
    /// Always `true`.
    pub ok: bool,
    /// The recorded history row.
    pub change: SeatPlanChange,
    /// How the change took effect.
    pub mode: ChangeMode,
    /// Usage measured against the limit now in force.
    pub usage_snapshot: SeatUsageSnapshot,
}

impl SeatChangeResponse {
    fn new(outcome: SeatChangeOutcome, mode: ChangeMode) -> Self {
        Self {
            ok: true,
            change: outcome.change,
            mode,
            usage_snapshot: outcome.usage_snapshot,
        }
    }
}

fn organization_id(path: Result<Path<Uuid>, PathRejection>) -> Result<OrganizationId, ApiError> {
    path.map(|Path(id)| OrganizationId::from_uuid(id))
        .map_err(|e| ApiError::bad_request("invalid_organization_id", e.body_text()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/organizations/{org_id}/billing/seats` - Plan, usage, cycle and history.
async fn get_seat_billing(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SeatBillingResponse>, ApiError> {
    let org_id = organization_id(path)?;
    let billing = state
        .service
        .get_billing_state(org_id, auth.user_id())
        .await?;

    Ok(Json(billing.into()))
}

/// GET `/organizations/{org_id}/billing/seats/cycle` - Current cycle window only.
async fn get_current_cycle(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BillingCycle>, ApiError> {
    let org_id = organization_id(path)?;
    let cycle = state.service.current_cycle(org_id, auth.user_id()).await?;

    Ok(Json(cycle))
}

/// POST `/organizations/{org_id}/billing/seats/changes` - Upgrade now or schedule a downgrade.
async fn create_seat_change(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SeatChangeBody>, JsonRejection>,
) -> Result<Json<SeatChangeResponse>, ApiError> {
    let org_id = organization_id(path)?;
    let Json(body) = body.map_err(|e| ApiError::bad_request("malformed_body", e.body_text()))?;

    let request = SeatChangeRequest {
        organization_id: org_id,
        actor: auth.user_id(),
        new_limit: body.new_limit,
        unit_price_cents: body.unit_price_cents,
        currency_code: body.currency_code,
        notes: body.notes,
    };

    let response = match body.action {
        ChangeAction::Upgrade => SeatChangeResponse::new(
            state.service.apply_upgrade(request).await?,
            ChangeMode::UpgradeApplied,
        ),
        ChangeAction::Downgrade => SeatChangeResponse::new(
            state.service.schedule_downgrade(request).await?,
            ChangeMode::DowngradeScheduled,
        ),
    };

    Ok(Json(response))
}
