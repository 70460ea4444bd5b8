/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Partition that owns a setting or a request.
///
/// Storage keeps a nullable `tenant_id`, but nothing above the repositories
/// ever sees that null: the global partition is its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tenant_id", rename_all = "lowercase")]
pub enum Scope {
    Global,
    Tenant(Uuid),
}

impl Scope {
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            Scope::Global => None,
            Scope::Tenant(id) => Some(*id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl From<Option<Uuid>> for Scope {
    fn from(tenant_id: Option<Uuid>) -> Self {
        match tenant_id {
            Some(id) => Scope::Tenant(id),
            None => Scope::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Tenant(id) => write!(f, "tenant:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Deleted,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for TenantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "suspended" => Ok(TenantStatus::Suspended),
            "deleted" => Ok(TenantStatus::Deleted),
            other => Err(format!("unknown tenant status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Free,
    Basic,
    Professional,
    Enterprise,
    Custom,
}

impl PlanId {
    pub const ALL: [PlanId; 5] = [
        PlanId::Free,
        PlanId::Basic,
        PlanId::Professional,
        PlanId::Enterprise,
        PlanId::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Basic => "basic",
            PlanId::Professional => "professional",
            PlanId::Enterprise => "enterprise",
            PlanId::Custom => "custom",
        }
    }
}

impl FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlanId::ALL
            .into_iter()
            .find(|plan| plan.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Annual,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Annual => "annual",
        }
    }

    /// Length of one cycle in calendar months.
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Annual => 12,
        }
    }
}

impl FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "annual" => Ok(BillingCycle::Annual),
            other => Err(format!("unknown billing cycle '{}'", other)),
        }
    }
}

/// Tenant-owned resources that count against plan limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Users,
    Branches,
    Services,
    Consents,
    Questions,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Users,
        ResourceType::Branches,
        ResourceType::Services,
        ResourceType::Consents,
        ResourceType::Questions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Users => "users",
            ResourceType::Branches => "branches",
            ResourceType::Services => "services",
            ResourceType::Consents => "consents",
            ResourceType::Questions => "questions",
        }
    }

    /// Table holding live rows of this resource. Only ever interpolated from
    /// this fixed list.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "users" | "user" => Ok(ResourceType::Users),
            "branches" | "branch" => Ok(ResourceType::Branches),
            "services" | "service" => Ok(ResourceType::Services),
            "consents" | "consent" => Ok(ResourceType::Consents),
            "questions" | "question" => Ok(ResourceType::Questions),
            _ => Err(format!("unknown resource type '{}'", s)),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-resource ceilings carried by plans and copied onto tenants.
/// A negative value means the resource is unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_users: i32,
    pub max_branches: i32,
    pub max_consents: i32,
    pub max_services: i32,
    pub max_questions: i32,
    pub storage_limit_mb: i32,
}

impl ResourceLimits {
    pub const UNLIMITED: i32 = -1;

    /// Effective ceiling for a resource; `None` when unlimited.
    pub fn limit_for(&self, resource: ResourceType) -> Option<i64> {
        let raw = match resource {
            ResourceType::Users => self.max_users,
            ResourceType::Branches => self.max_branches,
            ResourceType::Services => self.max_services,
            ResourceType::Consents => self.max_consents,
            ResourceType::Questions => self.max_questions,
        };
        (raw >= 0).then_some(i64::from(raw))
    }
}

/// Manual per-field overrides. Unset fields keep their current value; the
/// next plan assignment discards all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct LimitOverrides {
    pub max_users: Option<i32>,
    pub max_branches: Option<i32>,
    pub max_consents: Option<i32>,
    pub max_services: Option<i32>,
    pub max_questions: Option<i32>,
    pub storage_limit_mb: Option<i32>,
}

impl LimitOverrides {
    pub fn apply(&self, current: ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            max_users: self.max_users.unwrap_or(current.max_users),
            max_branches: self.max_branches.unwrap_or(current.max_branches),
            max_consents: self.max_consents.unwrap_or(current.max_consents),
            max_services: self.max_services.unwrap_or(current.max_services),
            max_questions: self.max_questions.unwrap_or(current.max_questions),
            storage_limit_mb: self.storage_limit_mb.unwrap_or(current.storage_limit_mb),
        }
    }
}
