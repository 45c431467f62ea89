//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! concreto migrate
//! ```
//!
//! # Environment Variables
//!
//! - `COSTING_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/costing/migrations/`, embedded at compile time.

use tracing::info;

use concreto_costing::CostingState;

/// Apply pending migrations of the `inventory` schema.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run(state: &CostingState) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running costing migrations...");
    concreto_costing::MIGRATOR.run(state.pool()).await?;
    info!("Costing migrations complete!");
    Ok(())
}
