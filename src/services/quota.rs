use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::database::models::Tenant;
use crate::database::{retry_idempotent, QueryBudget, RetryPolicy, UsageCounter};
use crate::services::error::TenancyError;
use crate::services::tenant_directory::TenantDirectory;
use crate::types::{BillingCycle, PlanId, ResourceLimits, ResourceType, Scope, TenantStatus};

const WARNING_PERCENT: i64 = 80;
const CRITICAL_PERCENT: i64 = 100;
// Tenants whose usage is read at once when building platform stats
const STATS_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub resource: ResourceType,
    pub current: i64,
    /// `None` when the plan leaves this resource unlimited
    pub limit: Option<i64>,
}

impl QuotaCheck {
    pub fn remaining(&self) -> Option<i64> {
        self.limit.map(|limit| (limit - self.current).max(0))
    }
}

/// Gate for resource creation: allowed while the live count is strictly
/// below the limit.
pub fn evaluate(limits: &ResourceLimits, resource: ResourceType, current: i64) -> Result<QuotaCheck, TenancyError> {
    let limit = limits.limit_for(resource);
    match limit {
        Some(limit) if current >= limit => Err(TenancyError::QuotaExceeded {
            resource,
            limit,
            current,
        }),
        _ => Ok(QuotaCheck {
            resource,
            current,
            limit,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceUsage {
    pub current: i64,
    pub max: Option<i64>,
    pub percentage: i64,
    pub status: UsageLevel,
}

impl ResourceUsage {
    /// Percentage is rounded and capped at 100. A zero limit counts as full.
    pub fn new(current: i64, max: Option<i64>) -> Self {
        let percentage = match max {
            None => 0,
            Some(0) => CRITICAL_PERCENT,
            Some(max) => {
                let rounded = (current.saturating_mul(100) + max / 2) / max;
                rounded.clamp(0, CRITICAL_PERCENT)
            }
        };
        let status = match percentage {
            p if p >= CRITICAL_PERCENT => UsageLevel::Critical,
            p if p >= WARNING_PERCENT => UsageLevel::Warning,
            _ => UsageLevel::Normal,
        };
        Self {
            current,
            max,
            percentage,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub tenant_id: Uuid,
    pub plan: PlanId,
    pub billing_cycle: BillingCycle,
    pub status: TenantStatus,
    pub storage_limit_mb: i32,
    pub resources: BTreeMap<ResourceType, ResourceUsage>,
    /// Resources at or above the warning threshold
    pub alerts: Vec<ResourceType>,
}

impl UsageReport {
    /// Most severe level across all resources.
    pub fn worst_level(&self) -> UsageLevel {
        self.resources
            .values()
            .map(|usage| usage.status)
            .max()
            .unwrap_or(UsageLevel::Normal)
    }
}

/// Platform-wide view over every live tenant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStats {
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub suspended_tenants: usize,
    /// Worst resource at `warning`
    pub tenants_near_limit: usize,
    /// Worst resource at `critical`
    pub tenants_at_limit: usize,
    pub plan_distribution: BTreeMap<PlanId, usize>,
    /// Live resources summed over all tenants
    pub resource_totals: BTreeMap<ResourceType, i64>,
}

/// Compares live resource counts against the tenant's limits.
///
/// The check and the caller's insert are separate steps, so two concurrent
/// creations can both pass and overshoot the limit by one.
#[derive(Clone)]
pub struct QuotaEnforcer {
    directory: TenantDirectory,
    usage: Arc<dyn UsageCounter>,
    budget: QueryBudget,
    retry: RetryPolicy,
}

impl QuotaEnforcer {
    pub fn new(directory: TenantDirectory, usage: Arc<dyn UsageCounter>, budget: QueryBudget, retry: RetryPolicy) -> Self {
        Self {
            directory,
            usage,
            budget,
            retry,
        }
    }

    pub async fn check_quota(&self, tenant_id: Uuid, resource: ResourceType) -> Result<QuotaCheck, TenancyError> {
        let tenant = self.directory.get(tenant_id).await?;
        self.check_tenant(&tenant, resource).await
    }

    /// Platform scope has no plan and therefore no limits.
    pub async fn check_for_scope(&self, scope: Scope, resource: ResourceType) -> Result<QuotaCheck, TenancyError> {
        match scope {
            Scope::Global => Ok(QuotaCheck {
                resource,
                current: 0,
                limit: None,
            }),
            Scope::Tenant(id) => self.check_quota(id, resource).await,
        }
    }

    pub async fn check_tenant(&self, tenant: &Tenant, resource: ResourceType) -> Result<QuotaCheck, TenancyError> {
        let current = self.count(tenant.id, resource).await?;
        evaluate(&tenant.limits, resource, current).map_err(|e| {
            debug!(tenant = %tenant.id, resource = %resource, current, "Quota exceeded");
            e
        })
    }

    pub async fn usage_report(&self, tenant_id: Uuid) -> Result<UsageReport, TenancyError> {
        let tenant = self.directory.get(tenant_id).await?;
        self.report_for(&tenant).await
    }

    async fn report_for(&self, tenant: &Tenant) -> Result<UsageReport, TenancyError> {
        let id = tenant.id;
        let counts = try_join_all(ResourceType::ALL.into_iter().map(|resource| async move {
            self.count(id, resource).await.map(|count| (resource, count))
        }))
        .await?;

        let resources: BTreeMap<ResourceType, ResourceUsage> = counts
            .into_iter()
            .map(|(resource, current)| (resource, ResourceUsage::new(current, tenant.limits.limit_for(resource))))
            .collect();
        let alerts = resources
            .iter()
            .filter(|(_, usage)| usage.status != UsageLevel::Normal)
            .map(|(resource, _)| *resource)
            .collect();

        Ok(UsageReport {
            tenant_id: tenant.id,
            plan: tenant.plan,
            billing_cycle: tenant.billing_cycle,
            status: tenant.status,
            storage_limit_mb: tenant.limits.storage_limit_mb,
            resources,
            alerts,
        })
    }

    /// Aggregates usage reports of every live tenant.
    pub async fn global_stats(&self) -> Result<GlobalStats, TenancyError> {
        let tenants = self.directory.list().await?;
        let pending: Vec<_> = tenants.iter().map(|tenant| self.report_for(tenant)).collect();
        let reports: Vec<UsageReport> = stream::iter(pending)
            .buffer_unordered(STATS_CONCURRENCY)
            .try_collect()
            .await?;

        let mut stats = GlobalStats {
            total_tenants: reports.len(),
            ..Default::default()
        };
        for report in &reports {
            match report.status {
                TenantStatus::Active => stats.active_tenants += 1,
                TenantStatus::Suspended => stats.suspended_tenants += 1,
                TenantStatus::Deleted => {}
            }
            match report.worst_level() {
                UsageLevel::Critical => stats.tenants_at_limit += 1,
                UsageLevel::Warning => stats.tenants_near_limit += 1,
                UsageLevel::Normal => {}
            }
            *stats.plan_distribution.entry(report.plan).or_default() += 1;
            for (resource, usage) in &report.resources {
                *stats.resource_totals.entry(*resource).or_default() += usage.current;
            }
        }

        debug!(
            tenants = stats.total_tenants,
            at_limit = stats.tenants_at_limit,
            near_limit = stats.tenants_near_limit,
            "Computed platform stats"
        );
        Ok(stats)
    }

    async fn count(&self, tenant_id: Uuid, resource: ResourceType) -> Result<i64, TenancyError> {
        let count = retry_idempotent(self.retry, "usage.count_live", || {
            self.budget.run("usage.count_live", self.usage.count_live(tenant_id, resource))
        })
        .await?;
        Ok(count)
    }
}
