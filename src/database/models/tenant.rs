use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::error::StoreError;
use crate::types::{BillingCycle, PlanId, ResourceLimits, TenantStatus};

/// Partial unique index keeping live slugs distinct
pub const TENANT_SLUG_INDEX: &str = "idx_tenants_slug_live";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    pub plan: PlanId,
    /// Price of one billing cycle, in minor currency units
    pub plan_price: i64,
    pub billing_cycle: BillingCycle,
    pub billing_day: i32,
    pub plan_started_at: Option<DateTime<Utc>>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub limits: ResourceLimits,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_suspended(&self) -> bool {
        self.status == TenantStatus::Suspended
    }
}

/// Values written when a tenant is provisioned
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub slug: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub billing_day: i32,
    pub assignment: PlanAssignment,
}

/// Complete plan-derived column set. Applying it overwrites every limit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanAssignment {
    pub plan: PlanId,
    pub plan_price: i64,
    pub billing_cycle: BillingCycle,
    pub limits: ResourceLimits,
    pub plan_started_at: DateTime<Utc>,
    pub plan_expires_at: Option<DateTime<Utc>>,
}

pub(crate) const TENANT_COLUMNS: &str = "id, name, slug, status, plan, plan_price, billing_cycle, \
     billing_day, plan_started_at, plan_expires_at, max_users, max_branches, max_consents, \
     max_services, max_questions, storage_limit_mb, contact_email, contact_phone, created_at, \
     updated_at, deleted_at";

/// Raw `tenants` row; enum columns are stored as text.
#[derive(Debug, FromRow)]
pub(crate) struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub plan: String,
    pub plan_price: i64,
    pub billing_cycle: String,
    pub billing_day: i32,
    pub plan_started_at: Option<DateTime<Utc>>,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub max_users: i32,
    pub max_branches: i32,
    pub max_consents: i32,
    pub max_services: i32,
    pub max_questions: i32,
    pub storage_limit_mb: i32,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = StoreError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: row.id,
            name: row.name,
            slug: row.slug,
            status: row.status.parse().map_err(StoreError::Decode)?,
            plan: row
                .plan
                .parse()
                .map_err(|plan| StoreError::Decode(format!("unknown plan '{}'", plan)))?,
            plan_price: row.plan_price,
            billing_cycle: row.billing_cycle.parse().map_err(StoreError::Decode)?,
            billing_day: row.billing_day,
            plan_started_at: row.plan_started_at,
            plan_expires_at: row.plan_expires_at,
            limits: ResourceLimits {
                max_users: row.max_users,
                max_branches: row.max_branches,
                max_consents: row.max_consents,
                max_services: row.max_services,
                max_questions: row.max_questions,
                storage_limit_mb: row.storage_limit_mb,
            },
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}
