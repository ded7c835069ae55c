//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Seat billing REST routes
//! - Bearer token authentication middleware
//! - JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;


use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use roster_core::seats::SeatBillingService;
use roster_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Seat billing engine.
    pub service: Arc<SeatBillingService>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
