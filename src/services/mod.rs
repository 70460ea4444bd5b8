pub mod branding;
pub mod error;
pub mod plan_catalog;
pub mod quota;
pub mod settings_service;
pub mod tenant_directory;

pub use branding::PublicSettings;
pub use error::TenancyError;
pub use plan_catalog::{BackupFrequency, PlanCatalog, PlanCatalogError, PlanDefinition, PlanFeatures};
pub use quota::{GlobalStats, QuotaCheck, QuotaEnforcer, ResourceUsage, UsageLevel, UsageReport};
pub use settings_service::{SettingsService, TenantContact};
pub use tenant_directory::{LimitOverrides, ProvisionRequest, TenantDirectory};
