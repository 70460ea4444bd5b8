use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::StoreError;
use crate::database::store::UsageCounter;
use crate::types::ResourceType;

/// Counts live rows straight from the resource tables, so out-of-band
/// deletions never leave a stale counter behind.
#[derive(Clone)]
pub struct PgUsageCounter {
    pool: PgPool,
}

impl PgUsageCounter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageCounter for PgUsageCounter {
    async fn count_live(&self, tenant_id: Uuid, resource: ResourceType) -> Result<i64, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE tenant_id = $1 AND deleted_at IS NULL",
            resource.table()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
