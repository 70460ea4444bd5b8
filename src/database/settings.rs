use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use std::collections::BTreeMap;

use crate::database::error::StoreError;
use crate::database::models::setting::SettingRow;
use crate::database::models::ScopedSetting;
use crate::database::store::SettingsStore;
use crate::types::Scope;

// The conflict targets name the partial unique indexes from the migration,
// so each scope has its own uniqueness domain.
const UPSERT_GLOBAL: &str = r#"
    INSERT INTO app_settings (key, value, tenant_id)
    VALUES ($1, $2, NULL)
    ON CONFLICT (key) WHERE tenant_id IS NULL
    DO UPDATE SET value = EXCLUDED.value, updated_at = now()
"#;

const UPSERT_TENANT: &str = r#"
    INSERT INTO app_settings (key, value, tenant_id)
    VALUES ($1, $2, $3)
    ON CONFLICT (key, tenant_id) WHERE tenant_id IS NOT NULL
    DO UPDATE SET value = EXCLUDED.value, updated_at = now()
"#;

/// `app_settings` table access
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn upsert_with<'e, E>(executor: E, scope: Scope, key: &str, value: &str) -> Result<(), StoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    match scope {
        Scope::Global => {
            sqlx::query(UPSERT_GLOBAL)
                .bind(key)
                .bind(value)
                .execute(executor)
                .await?;
        }
        Scope::Tenant(tenant_id) => {
            sqlx::query(UPSERT_TENANT)
                .bind(key)
                .bind(value)
                .bind(tenant_id)
                .execute(executor)
                .await?;
        }
    }
    Ok(())
}

async fn delete_with<'e, E>(executor: E, scope: Scope) -> Result<u64, StoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = match scope {
        Scope::Global => {
            sqlx::query("DELETE FROM app_settings WHERE tenant_id IS NULL")
                .execute(executor)
                .await?
        }
        Scope::Tenant(tenant_id) => {
            sqlx::query("DELETE FROM app_settings WHERE tenant_id = $1")
                .bind(tenant_id)
                .execute(executor)
                .await?
        }
    };
    Ok(result.rows_affected())
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self, scope: Scope, key: &str) -> Result<Option<ScopedSetting>, StoreError> {
        let row = match scope {
            Scope::Global => {
                sqlx::query_as::<_, SettingRow>(
                    "SELECT key, value, tenant_id, updated_at FROM app_settings \
                     WHERE key = $1 AND tenant_id IS NULL",
                )
                .bind(key)
                .fetch_optional(&self.pool)
                .await?
            }
            Scope::Tenant(tenant_id) => {
                sqlx::query_as::<_, SettingRow>(
                    "SELECT key, value, tenant_id, updated_at FROM app_settings \
                     WHERE key = $1 AND tenant_id = $2",
                )
                .bind(key)
                .bind(tenant_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(row.map(ScopedSetting::from))
    }

    async fn list(&self, scope: Scope) -> Result<Vec<ScopedSetting>, StoreError> {
        let rows = match scope {
            Scope::Global => {
                sqlx::query_as::<_, SettingRow>(
                    "SELECT key, value, tenant_id, updated_at FROM app_settings \
                     WHERE tenant_id IS NULL ORDER BY key",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Scope::Tenant(tenant_id) => {
                sqlx::query_as::<_, SettingRow>(
                    "SELECT key, value, tenant_id, updated_at FROM app_settings \
                     WHERE tenant_id = $1 ORDER BY key",
                )
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(ScopedSetting::from).collect())
    }

    async fn upsert(&self, scope: Scope, key: &str, value: &str) -> Result<(), StoreError> {
        upsert_with(&self.pool, scope, key, value).await
    }

    async fn upsert_many(&self, scope: Scope, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            upsert_with(&mut *tx, scope, key, value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reset_scope(&self, scope: Scope, defaults: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        delete_with(&mut *tx, scope).await?;
        for (key, value) in defaults {
            // Upsert rather than insert: a concurrent reset of the same scope
            // may already have written the key.
            upsert_with(&mut *tx, scope, key, value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_scope(&self, scope: Scope) -> Result<u64, StoreError> {
        delete_with(&self.pool, scope).await
    }
}
