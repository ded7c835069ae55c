//! Database migration runner for Roster.
//!
//! Reads `DATABASE_URL` (or `--database-url`). Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Roll back the seat billing schema
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-run migrations

use sea_orm_migration::prelude::*;
use roster_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own tracing subscriber.
    cli::run_cli(Migrator).await;
}
