//! Costing state shared by callers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::CostingConfig;
use crate::db::create_pool;
use crate::error::CostingError;
use crate::services::{
    ConfirmationService, CostReportService, ReceivingService, ValuationService,
};

/// Configuration plus connection pool; cheap to clone.
#[derive(Clone)]
pub struct CostingState {
    inner: Arc<CostingStateInner>,
}

struct CostingStateInner {
    config: CostingConfig,
    pool: PgPool,
}

impl CostingState {
    /// Build state from an existing pool.
    #[must_use]
    pub fn new(config: CostingConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(CostingStateInner { config, pool }),
        }
    }

    /// Open a connection pool for `config` and build state from it.
    ///
    /// # Errors
    ///
    /// Returns `CostingError::Repository` if the database is unreachable.
    pub async fn connect(config: CostingConfig) -> Result<Self, CostingError> {
        let pool = create_pool(&config.database_url, &config.pool).await?;
        Ok(Self::new(config, pool))
    }

    #[must_use]
    pub fn config(&self) -> &CostingConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Confirmation orchestrator using the configured retry policy.
    #[must_use]
    pub fn confirmations(&self) -> ConfirmationService {
        ConfirmationService::new(self.inner.pool.clone(), self.inner.config.confirmation)
    }

    #[must_use]
    pub fn valuations(&self) -> ValuationService {
        ValuationService::new(self.inner.pool.clone())
    }

    #[must_use]
    pub fn cost_reports(&self) -> CostReportService {
        CostReportService::new(self.inner.pool.clone())
    }

    #[must_use]
    pub fn receiving(&self) -> ReceivingService {
        ReceivingService::new(self.inner.pool.clone())
    }
}
