//! FIFO material-consumption costing.
//!
//! Persists the entry ledger (receiving lots) and the append-only allocation
//! ledger in `PostgreSQL`, and exposes the services that read and mutate
//! them:
//!
//! - [`ConfirmationService`](services::ConfirmationService) - allocate a
//!   remision's material usage against lots, oldest first, in one transaction
//! - [`ValuationService`](services::ValuationService) - value remaining stock
//! - [`CostReportService`](services::CostReportService) - read back line and
//!   remision costs
//! - [`ReceivingService`](services::ReceivingService) - record receipts
//!
//! The allocation algorithm itself is pure and lives in `concreto_core::fifo`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::CostingConfig;
pub use error::{CostingError, ErrorKind};
pub use state::CostingState;

/// Embedded migrations for the `inventory` schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
