use chrono::{DateTime, Months, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::models::{NewTenant, PlanAssignment, Tenant, TENANT_SLUG_INDEX};
use crate::database::{retry_idempotent, QueryBudget, RetryPolicy, StoreError, TenantStore};
use crate::resolver::{HostResolver, TenantScope};
use crate::services::error::TenancyError;
use crate::services::plan_catalog::{PlanCatalog, PlanDefinition};
use crate::services::settings_service::{SettingsService, TenantContact};
use crate::types::{BillingCycle, PlanId, TenantStatus};

pub use crate::types::LimitOverrides;

const SLUG_MIN: usize = 2;
const SLUG_MAX: usize = 63;
pub const DEFAULT_BILLING_DAY: i32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    pub name: String,
    /// Derived from `name` when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub billing_day: Option<i32>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

fn default_plan() -> String {
    PlanId::Free.as_str().to_string()
}

/// Authoritative tenant records: resolution, provisioning, plans, lifecycle.
#[derive(Clone)]
pub struct TenantDirectory {
    tenants: Arc<dyn TenantStore>,
    settings: SettingsService,
    catalog: Arc<PlanCatalog>,
    resolver: Arc<HostResolver>,
    budget: QueryBudget,
    retry: RetryPolicy,
}

impl TenantDirectory {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        settings: SettingsService,
        catalog: Arc<PlanCatalog>,
        resolver: Arc<HostResolver>,
        budget: QueryBudget,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            tenants,
            settings,
            catalog,
            resolver,
            budget,
            retry,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Live tenant owning `slug`. Suspended tenants still resolve; callers
    /// decide whether suspension blocks them.
    pub async fn resolve(&self, slug: &str) -> Result<Tenant, TenancyError> {
        let slug = slug.trim().to_ascii_lowercase();
        let found = retry_idempotent(self.retry, "tenants.find_by_slug", || {
            self.budget.run("tenants.find_by_slug", self.tenants.find_by_slug(&slug))
        })
        .await?;

        found.ok_or_else(|| {
            debug!(slug = %slug, "No live tenant for slug");
            TenancyError::TenantNotFound(slug)
        })
    }

    /// Tenant behind a resolved request scope; `None` for the platform.
    pub async fn resolve_scope(&self, scope: &TenantScope) -> Result<Option<Tenant>, TenancyError> {
        match scope {
            TenantScope::Platform => Ok(None),
            TenantScope::Tenant(slug) => self.resolve(slug).await.map(Some),
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        retry_idempotent(self.retry, "tenants.find_by_id", || {
            self.budget.run("tenants.find_by_id", self.tenants.find_by_id(id))
        })
        .await?
        .ok_or_else(|| TenancyError::tenant_not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, TenancyError> {
        let tenants = retry_idempotent(self.retry, "tenants.list", || {
            self.budget.run("tenants.list", self.tenants.list())
        })
        .await?;
        Ok(tenants)
    }

    pub async fn provision(&self, request: ProvisionRequest) -> Result<Tenant, TenancyError> {
        let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => explicit.to_ascii_lowercase(),
            None => slugify(&request.name),
        };
        validate_slug(&slug)?;
        if self.resolver.is_reserved(&slug) {
            return Err(TenancyError::ReservedSlug(slug));
        }

        let billing_day = request.billing_day.unwrap_or(DEFAULT_BILLING_DAY);
        validate_billing_day(billing_day)?;

        let plan = self.catalog.lookup(&request.plan)?;
        let assignment = plan_assignment(plan, request.billing_cycle, Utc::now());

        let contact = TenantContact {
            name: request.name.trim().to_string(),
            email: request.contact_email.clone(),
            phone: request.contact_phone.clone(),
        };
        let new_tenant = NewTenant {
            name: contact.name.clone(),
            slug: slug.clone(),
            contact_email: request.contact_email,
            contact_phone: request.contact_phone,
            billing_day,
            assignment,
        };

        let tenant = self
            .budget
            .run("tenants.insert", self.tenants.insert(new_tenant))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { constraint } if constraint == TENANT_SLUG_INDEX => {
                    TenancyError::SlugTaken(slug.clone())
                }
                other => other.into(),
            })?;

        info!(tenant = %tenant.id, slug = %tenant.slug, plan = %tenant.plan, "Tenant provisioned");

        if let Err(e) = self.settings.initialize_tenant(tenant.id, &contact).await {
            // The tenant row exists; settings can be written later.
            warn!(tenant = %tenant.id, error = %e, "Failed to initialize tenant settings");
        }

        Ok(tenant)
    }

    /// Snaps the tenant to the plan's price and full limit tuple, discarding
    /// any manual overrides.
    pub async fn assign_plan(&self, id: Uuid, plan: &str, cycle: BillingCycle) -> Result<Tenant, TenancyError> {
        let definition = self.catalog.lookup(plan)?;
        let assignment = plan_assignment(definition, cycle, Utc::now());

        let tenant = self
            .budget
            .run("tenants.apply_plan", self.tenants.apply_plan(id, &assignment))
            .await?
            .ok_or_else(|| TenancyError::tenant_not_found(id))?;

        info!(tenant = %id, plan = %tenant.plan, cycle = cycle.as_str(), "Plan assigned");
        Ok(tenant)
    }

    /// Merges the overrides into the stored limits in a single write, so
    /// concurrent overrides of different fields both survive.
    pub async fn update_limits(&self, id: Uuid, overrides: LimitOverrides) -> Result<Tenant, TenancyError> {
        let tenant = self
            .budget
            .run("tenants.update_limits", self.tenants.update_limits(id, &overrides))
            .await?
            .ok_or_else(|| TenancyError::tenant_not_found(id))?;

        info!(tenant = %id, "Tenant limits overridden");
        Ok(tenant)
    }

    pub async fn suspend(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.set_status(id, TenantStatus::Suspended).await
    }

    pub async fn activate(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        self.set_status(id, TenantStatus::Active).await
    }

    async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<Tenant, TenancyError> {
        let tenant = self
            .budget
            .run("tenants.set_status", self.tenants.set_status(id, status))
            .await?
            .ok_or_else(|| TenancyError::tenant_not_found(id))?;

        info!(tenant = %id, status = status.as_str(), "Tenant status changed");
        Ok(tenant)
    }

    pub async fn set_billing_day(&self, id: Uuid, billing_day: i32) -> Result<Tenant, TenancyError> {
        validate_billing_day(billing_day)?;
        self.budget
            .run("tenants.set_billing_day", self.tenants.set_billing_day(id, billing_day))
            .await?
            .ok_or_else(|| TenancyError::tenant_not_found(id))
    }

    /// Marks the tenant deleted. Its slug becomes available again and its
    /// settings and resources are logically removed with it.
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), TenancyError> {
        let deleted = self
            .budget
            .run("tenants.soft_delete", self.tenants.soft_delete(id))
            .await?;

        if !deleted {
            return Err(TenancyError::tenant_not_found(id));
        }
        info!(tenant = %id, "Tenant soft-deleted");
        Ok(())
    }
}

/// Plan-derived columns for an assignment starting at `now`.
pub fn plan_assignment(plan: &PlanDefinition, cycle: BillingCycle, now: DateTime<Utc>) -> PlanAssignment {
    PlanAssignment {
        plan: plan.id,
        plan_price: plan.price_for(cycle),
        billing_cycle: cycle,
        limits: plan.resource_limits(),
        plan_started_at: now,
        plan_expires_at: now.checked_add_months(Months::new(cycle.months())),
    }
}

pub fn validate_billing_day(day: i32) -> Result<(), TenancyError> {
    if (1..=28).contains(&day) {
        Ok(())
    } else {
        Err(TenancyError::InvalidBillingDay(day))
    }
}

pub fn validate_slug(slug: &str) -> Result<(), TenancyError> {
    let invalid = |reason| TenancyError::InvalidSlug {
        slug: slug.to_string(),
        reason,
    };

    if slug.len() < SLUG_MIN || slug.len() > SLUG_MAX {
        return Err(invalid("must be 2 to 63 characters"));
    }
    if !slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(invalid("must not start or end with '-'"));
    }
    Ok(())
}

/// URL-safe slug from a display name: lowercase ASCII, accents folded, runs
/// of anything else collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let mut buf = [0u8; 4];
        let piece = if c.is_ascii_alphanumeric() {
            Some(&*c.encode_utf8(&mut buf))
        } else {
            fold_accent(c)
        };

        match piece {
            Some(ascii) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(ascii);
            }
            None => pending_dash = true,
        }
    }

    slug.truncate(SLUG_MAX);
    slug.trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::TimeZone;

    fn directory(store: &MemoryStore) -> TenantDirectory {
        let settings = SettingsService::new(Arc::new(store.clone()), QueryBudget::default(), RetryPolicy::default());
        TenantDirectory::new(
            Arc::new(store.clone()),
            settings,
            Arc::new(PlanCatalog::builtin()),
            Arc::new(HostResolver::new("admin", ["www"])),
            QueryBudget::default(),
            RetryPolicy::default(),
        )
    }

    fn request(name: &str, slug: Option<&str>, plan: &str) -> ProvisionRequest {
        ProvisionRequest {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            plan: plan.to_string(),
            billing_cycle: BillingCycle::Monthly,
            billing_day: None,
            contact_email: Some("ops@example.com".to_string()),
            contact_phone: None,
        }
    }

    #[test]
    fn slugify_folds_accents_and_punctuation() {
        assert_eq!(slugify("Clínica San José"), "clinica-san-jose");
        assert_eq!(slugify("  --Dr. Müller & Söhne!! "), "dr-muller-sohne");
        assert_eq!(slugify("Straße 42"), "strasse-42");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("demo").is_ok());
        assert!(validate_slug("clinic-42").is_ok());
        assert!(validate_slug("a").is_err());
        assert!(validate_slug("-demo").is_err());
        assert!(validate_slug("demo-").is_err());
        assert!(validate_slug("De_mo").is_err());
        assert!(validate_slug(&"a".repeat(64)).is_err());
    }

    #[test]
    fn billing_day_range() {
        assert!(validate_billing_day(1).is_ok());
        assert!(validate_billing_day(28).is_ok());
        assert!(matches!(validate_billing_day(0), Err(TenancyError::InvalidBillingDay(0))));
        assert!(validate_billing_day(29).is_err());
    }

    #[test]
    fn assignment_dates_follow_cycle() {
        let catalog = PlanCatalog::builtin();
        let basic = catalog.get(PlanId::Basic).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();

        let monthly = plan_assignment(basic, BillingCycle::Monthly, now);
        assert_eq!(monthly.plan_price, 89_900);
        assert_eq!(monthly.plan_expires_at, Some(Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap()));

        let annual = plan_assignment(basic, BillingCycle::Annual, now);
        assert_eq!(annual.plan_price, 895_404);
        assert_eq!(annual.plan_expires_at, Some(Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn provision_applies_plan_and_seeds_settings() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let tenant = directory
            .provision(request("Clínica Norte", None, "professional"))
            .await
            .unwrap();

        assert_eq!(tenant.slug, "clinica-norte");
        assert_eq!(tenant.plan, PlanId::Professional);
        assert_eq!(tenant.limits.max_users, 5);
        assert_eq!(tenant.billing_day, DEFAULT_BILLING_DAY);
        assert_eq!(directory.resolve("Clinica-Norte").await.unwrap().id, tenant.id);

        let name = directory
            .settings
            .get(crate::types::Scope::Tenant(tenant.id), "companyName")
            .await
            .unwrap();
        assert_eq!(name.value, "Clínica Norte");
    }

    #[tokio::test]
    async fn provision_rejects_bad_input() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let reserved = directory.provision(request("Admin", None, "free")).await.unwrap_err();
        assert!(matches!(reserved, TenancyError::ReservedSlug(s) if s == "admin"));

        let www = directory.provision(request("x", Some("www"), "free")).await.unwrap_err();
        assert!(matches!(www, TenancyError::ReservedSlug(_)));

        let plan = directory.provision(request("Demo", None, "gold")).await.unwrap_err();
        assert!(matches!(plan, TenancyError::UnknownPlan(p) if p == "gold"));

        let slug = directory.provision(request("!", None, "free")).await.unwrap_err();
        assert!(matches!(slug, TenancyError::InvalidSlug { .. }));

        let mut bad_day = request("Demo", None, "free");
        bad_day.billing_day = Some(31);
        assert!(matches!(
            directory.provision(bad_day).await.unwrap_err(),
            TenancyError::InvalidBillingDay(31)
        ));
    }

    #[tokio::test]
    async fn live_slugs_are_unique_but_reusable_after_delete() {
        let store = MemoryStore::new();
        let directory = directory(&store);

        let first = directory.provision(request("Demo", None, "free")).await.unwrap();
        let taken = directory.provision(request("Demo Two", Some("demo"), "free")).await.unwrap_err();
        assert!(matches!(taken, TenancyError::SlugTaken(s) if s == "demo"));

        directory.soft_delete(first.id).await.unwrap();
        assert!(matches!(
            directory.resolve("demo").await.unwrap_err(),
            TenancyError::TenantNotFound(s) if s == "demo"
        ));
        assert!(matches!(
            directory.soft_delete(first.id).await.unwrap_err(),
            TenancyError::TenantNotFound(_)
        ));

        let second = directory.provision(request("Demo", None, "basic")).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(directory.resolve("demo").await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn soft_delete_drops_tenant_settings() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let tenant = directory.provision(request("Demo", None, "free")).await.unwrap();
        let scope = crate::types::Scope::Tenant(tenant.id);

        assert!(!directory.settings.get_all(scope).await.unwrap().is_empty());
        directory.soft_delete(tenant.id).await.unwrap();
        assert!(directory.settings.get_all(scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assign_plan_overwrites_overrides() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let tenant = directory.provision(request("Demo", None, "basic")).await.unwrap();

        let overridden = directory
            .update_limits(
                tenant.id,
                LimitOverrides {
                    max_users: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(overridden.limits.max_users, 50);
        assert_eq!(overridden.limits.max_branches, tenant.limits.max_branches);

        let reassigned = directory
            .assign_plan(tenant.id, "basic", BillingCycle::Annual)
            .await
            .unwrap();
        let basic = PlanCatalog::builtin().get(PlanId::Basic).unwrap().resource_limits();
        assert_eq!(reassigned.limits, basic);
        assert_eq!(reassigned.billing_cycle, BillingCycle::Annual);
        assert_eq!(reassigned.plan_price, 895_404);

        let unknown = directory.assign_plan(tenant.id, "platinum", BillingCycle::Monthly).await;
        assert!(matches!(unknown, Err(TenancyError::UnknownPlan(_))));
        let missing = directory.assign_plan(Uuid::new_v4(), "free", BillingCycle::Monthly).await;
        assert!(matches!(missing, Err(TenancyError::TenantNotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_overrides_of_different_fields_both_survive() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let tenant = directory.provision(request("Demo", None, "basic")).await.unwrap();

        let users = LimitOverrides {
            max_users: Some(40),
            ..Default::default()
        };
        let branches = LimitOverrides {
            max_branches: Some(9),
            ..Default::default()
        };
        let (a, b) = tokio::join!(
            directory.update_limits(tenant.id, users),
            directory.update_limits(tenant.id, branches),
        );
        a.unwrap();
        b.unwrap();

        let limits = directory.get(tenant.id).await.unwrap().limits;
        assert_eq!(limits.max_users, 40);
        assert_eq!(limits.max_branches, 9);
        assert_eq!(limits.max_consents, tenant.limits.max_consents);

        let missing = directory.update_limits(Uuid::new_v4(), users).await;
        assert!(matches!(missing, Err(TenancyError::TenantNotFound(_))));
    }

    #[tokio::test]
    async fn suspend_and_activate() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        let tenant = directory.provision(request("Demo", None, "free")).await.unwrap();

        assert!(directory.suspend(tenant.id).await.unwrap().is_suspended());
        // Suspended tenants still resolve.
        assert!(directory.resolve("demo").await.unwrap().is_suspended());
        assert_eq!(directory.activate(tenant.id).await.unwrap().status, TenantStatus::Active);

        assert_eq!(directory.set_billing_day(tenant.id, 15).await.unwrap().billing_day, 15);
        assert!(directory.set_billing_day(tenant.id, 29).await.is_err());
    }

    #[tokio::test]
    async fn resolve_scope_maps_platform_to_none() {
        let store = MemoryStore::new();
        let directory = directory(&store);
        directory.provision(request("Demo", None, "free")).await.unwrap();

        assert!(directory.resolve_scope(&TenantScope::Platform).await.unwrap().is_none());
        let found = directory
            .resolve_scope(&TenantScope::Tenant("demo".into()))
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.slug), Some("demo".to_string()));
        assert_eq!(directory.list().await.unwrap().len(), 1);
    }
}
