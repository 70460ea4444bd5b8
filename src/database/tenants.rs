use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::error::StoreError;
use crate::database::models::tenant::{TenantRow, TENANT_COLUMNS};
use crate::database::models::{NewTenant, PlanAssignment, Tenant};
use crate::database::store::TenantStore;
use crate::types::{LimitOverrides, ResourceType, TenantStatus};

/// `tenants` table access
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, sql: String, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn insert(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO tenants (
                id, name, slug, status, plan, plan_price, billing_cycle, billing_day,
                plan_started_at, plan_expires_at, max_users, max_branches, max_consents,
                max_services, max_questions, storage_limit_mb, contact_email, contact_phone
            )
            VALUES ($1, $2, $3, 'active', $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {TENANT_COLUMNS}
            "#
        );
        let plan = &tenant.assignment;

        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&tenant.name)
            .bind(&tenant.slug)
            .bind(plan.plan.as_str())
            .bind(plan.plan_price)
            .bind(plan.billing_cycle.as_str())
            .bind(tenant.billing_day)
            .bind(plan.plan_started_at)
            .bind(plan.plan_expires_at)
            .bind(plan.limits.max_users)
            .bind(plan.limits.max_branches)
            .bind(plan.limits.max_consents)
            .bind(plan.limits.max_services)
            .bind(plan.limits.max_questions)
            .bind(plan.limits.storage_limit_mb)
            .bind(&tenant.contact_email)
            .bind(&tenant.contact_phone)
            .fetch_one(&self.pool)
            .await?;

        Tenant::try_from(row)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StoreError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1 AND deleted_at IS NULL");
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1 AND deleted_at IS NULL");
        self.fetch_by_id(sql, id).await
    }

    async fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        let sql = format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE deleted_at IS NULL ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Tenant::try_from).collect()
    }

    async fn apply_plan(&self, id: Uuid, assignment: &PlanAssignment) -> Result<Option<Tenant>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tenants SET
                plan = $2,
                plan_price = $3,
                billing_cycle = $4,
                plan_started_at = $5,
                plan_expires_at = $6,
                max_users = $7,
                max_branches = $8,
                max_consents = $9,
                max_services = $10,
                max_questions = $11,
                storage_limit_mb = $12,
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {TENANT_COLUMNS}
            "#
        );
        let limits = &assignment.limits;

        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(assignment.plan.as_str())
            .bind(assignment.plan_price)
            .bind(assignment.billing_cycle.as_str())
            .bind(assignment.plan_started_at)
            .bind(assignment.plan_expires_at)
            .bind(limits.max_users)
            .bind(limits.max_branches)
            .bind(limits.max_consents)
            .bind(limits.max_services)
            .bind(limits.max_questions)
            .bind(limits.storage_limit_mb)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Tenant::try_from).transpose()
    }

    async fn update_limits(&self, id: Uuid, overrides: &LimitOverrides) -> Result<Option<Tenant>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tenants SET
                max_users = COALESCE($2, max_users),
                max_branches = COALESCE($3, max_branches),
                max_consents = COALESCE($4, max_consents),
                max_services = COALESCE($5, max_services),
                max_questions = COALESCE($6, max_questions),
                storage_limit_mb = COALESCE($7, storage_limit_mb),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {TENANT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(overrides.max_users)
            .bind(overrides.max_branches)
            .bind(overrides.max_consents)
            .bind(overrides.max_services)
            .bind(overrides.max_questions)
            .bind(overrides.storage_limit_mb)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Tenant::try_from).transpose()
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Option<Tenant>, StoreError> {
        let sql = format!(
            "UPDATE tenants SET status = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn set_billing_day(&self, id: Uuid, billing_day: i32) -> Result<Option<Tenant>, StoreError> {
        let sql = format!(
            "UPDATE tenants SET billing_day = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {TENANT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(id)
            .bind(billing_day)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE tenants SET deleted_at = now(), status = 'deleted', updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for resource in ResourceType::ALL {
            let sql = format!(
                "UPDATE {} SET deleted_at = now() WHERE tenant_id = $1 AND deleted_at IS NULL",
                resource.table()
            );
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }

        sqlx::query("DELETE FROM app_settings WHERE tenant_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
