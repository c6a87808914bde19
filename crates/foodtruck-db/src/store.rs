//! The store seam the HTTP layer depends on.

use async_trait::async_trait;
use foodtruck_core::{FindFilter, FoodQuery, FoodRecord, QueryPlan, VendorMatch, VendorRecord};
use sqlx::PgPool;

use crate::DbError;

/// Read access to the vendor catalog.
///
/// Handlers hold an `Arc<dyn VendorStore>` so tests can substitute an
/// in-memory implementation for Postgres.
#[async_trait]
pub trait VendorStore: Send + Sync {
    /// Execute an ordered aggregation plan.
    async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<VendorMatch>, DbError>;

    /// Execute a plain lookup without aggregation semantics.
    async fn find(&self, filter: FindFilter) -> Result<Vec<VendorRecord>, DbError>;

    async fn search_foods(&self, query: &FoodQuery) -> Result<Vec<FoodRecord>, DbError>;

    async fn health_check(&self) -> Result<(), DbError>;
}

/// Postgres-backed [`VendorStore`].
#[derive(Debug, Clone)]
pub struct PgVendorStore {
    pool: PgPool,
}

impl PgVendorStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VendorStore for PgVendorStore {
    async fn aggregate(&self, plan: &QueryPlan) -> Result<Vec<VendorMatch>, DbError> {
        tracing::debug!(plan = %plan.to_json(), "executing vendor plan");
        crate::aggregate_vendors(&self.pool, plan).await
    }

    async fn find(&self, filter: FindFilter) -> Result<Vec<VendorRecord>, DbError> {
        tracing::debug!(?filter, "executing vendor lookup");
        crate::find_vendors(&self.pool, filter).await
    }

    async fn search_foods(&self, query: &FoodQuery) -> Result<Vec<FoodRecord>, DbError> {
        Ok(crate::search_foods(&self.pool, query).await?)
    }

    async fn health_check(&self) -> Result<(), DbError> {
        crate::ping(&self.pool).await?;
        Ok(())
    }
}
