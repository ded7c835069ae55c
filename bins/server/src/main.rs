//! Roster API Server
//!
//! Serves the seat billing routes over Postgres-backed storage.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_api::{AppState, create_router};
use roster_core::seats::{SeatBillingService, SeatBillingSettings, TracingAuditSink};
use roster_db::{MemberRepository, SeatPlanRepository, connect_with};
use roster_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let settings = SeatBillingSettings::from(&config.billing);
    let members = Arc::new(MemberRepository::new(db.clone()));
    let service = SeatBillingService::new(
        Arc::new(SeatPlanRepository::new(db)),
        members.clone(),
        members,
        Arc::new(TracingAuditSink),
    )
    .with_settings(settings);
    info!(
        history_limit = settings.history_limit,
        storage_timeout_ms = config.billing.storage_timeout_ms,
        "Seat billing service configured"
    );

    let jwt_service = JwtService::new(&JwtConfig {
        secret: config.jwt.secret.clone(),
    });

    let state = AppState {
        service: Arc::new(service),
        jwt_service: Arc::new(jwt_service),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
