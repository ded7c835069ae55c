//! Seat rollover reconciler.
//!
//! Usage:
//!   roster-reconciler          - Run a pass every `billing.reconcile_interval_secs`
//!   roster-reconciler --once   - Run a single pass and exit
//!
//! Each pass applies every scheduled downgrade whose cycle has ended. A failed
//! organization is logged and retried on the next pass.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_core::seats::{CycleRolloverReconciler, SeatBillingSettings, TracingAuditSink};
use roster_db::{MemberRepository, SeatPlanRepository, connect_with};
use roster_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let once = std::env::args().skip(1).any(|arg| arg == "--once");
    let config = AppConfig::load()?;

    let db = connect_with(&config.database).await?;
    info!("Connected to database");

    let reconciler = CycleRolloverReconciler::new(
        Arc::new(SeatPlanRepository::new(db.clone())),
        Arc::new(MemberRepository::new(db)),
        Arc::new(TracingAuditSink),
    )
    .with_settings(SeatBillingSettings::from(&config.billing));

    if once {
        let report = reconciler.run_once().await?;
        info!(
            applied = report.applied,
            applied_over_usage = report.applied_over_usage,
            failed = report.failed,
            "Single pass complete"
        );
        return Ok(());
    }

    let period = Duration::from_secs(config.billing.reconcile_interval_secs.max(1));
    info!(interval_secs = period.as_secs(), "Reconciler started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = reconciler.run_once().await {
                    error!(error = %err, "Reconciler pass failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
