use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::services::error::TenancyError;
use crate::types::{BillingCycle, PlanId, ResourceLimits};

#[derive(Debug, thiserror::Error)]
pub enum PlanCatalogError {
    #[error("Failed to read plan catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON plan catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML plan catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported plan catalog format: {0}")]
    UnsupportedFormat(String),
    #[error("Plan catalog is empty")]
    Empty,
}

/// Per-resource limits as written in catalog files. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub users: i32,
    pub branches: i32,
    pub consents: i32,
    pub services: i32,
    pub questions: i32,
    pub storage_mb: i32,
}

impl From<PlanLimits> for ResourceLimits {
    fn from(limits: PlanLimits) -> Self {
        ResourceLimits {
            max_users: limits.users,
            max_branches: limits.branches,
            max_consents: limits.consents,
            max_services: limits.services,
            max_questions: limits.questions,
            storage_limit_mb: limits.storage_mb,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    #[default]
    None,
    Weekly,
    Daily,
}

impl BackupFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupFrequency::None => "none",
            BackupFrequency::Weekly => "weekly",
            BackupFrequency::Daily => "daily",
        }
    }
}

/// Capabilities a plan unlocks beyond its resource limits. Fields missing
/// from a catalog file are off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanFeatures {
    pub customization: bool,
    pub advanced_reports: bool,
    pub priority_support: bool,
    pub custom_domain: bool,
    pub white_label: bool,
    pub api_access: bool,
    pub backup: BackupFrequency,
    pub support_response_time: String,
}

impl PlanFeatures {
    /// Names of the enabled boolean features, in catalog order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("customization", self.customization),
            ("advancedReports", self.advanced_reports),
            ("prioritySupport", self.priority_support),
            ("customDomain", self.custom_domain),
            ("whiteLabel", self.white_label),
            ("apiAccess", self.api_access),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefinition {
    pub id: PlanId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_monthly: i64,
    pub price_annual: i64,
    pub limits: PlanLimits,
    #[serde(default)]
    pub features: PlanFeatures,
    #[serde(default)]
    pub popular: bool,
}

impl PlanDefinition {
    pub fn price_for(&self, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => self.price_monthly,
            BillingCycle::Annual => self.price_annual,
        }
    }

    pub fn resource_limits(&self) -> ResourceLimits {
        self.limits.into()
    }
}

/// Static plan definitions, read once at startup.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: BTreeMap<PlanId, PlanDefinition>,
}

impl PlanCatalog {
    pub fn new(plans: impl IntoIterator<Item = PlanDefinition>) -> Result<Self, PlanCatalogError> {
        let plans: BTreeMap<PlanId, PlanDefinition> = plans.into_iter().map(|p| (p.id, p)).collect();
        if plans.is_empty() {
            return Err(PlanCatalogError::Empty);
        }
        Ok(Self { plans })
    }

    pub fn builtin() -> Self {
        let plan = |id, name: &str, description: &str, monthly, annual, limits: [i32; 6], features, popular| PlanDefinition {
            id,
            name: name.to_string(),
            description: description.to_string(),
            price_monthly: monthly,
            price_annual: annual,
            limits: PlanLimits {
                users: limits[0],
                branches: limits[1],
                consents: limits[2],
                services: limits[3],
                questions: limits[4],
                storage_mb: limits[5],
            },
            features,
            popular,
        };
        // customization, advanced reports, priority support, custom domain,
        // white label, api access
        let features = |flags: [bool; 6], backup, response: &str| PlanFeatures {
            customization: flags[0],
            advanced_reports: flags[1],
            priority_support: flags[2],
            custom_domain: flags[3],
            white_label: flags[4],
            api_access: flags[5],
            backup,
            support_response_time: response.to_string(),
        };
        let unlimited = ResourceLimits::UNLIMITED;

        let plans = [
            plan(
                PlanId::Free,
                "Free",
                "Seven day trial",
                0,
                0,
                [1, 1, 20, 3, 6, 200],
                features([false; 6], BackupFrequency::None, "48h"),
                false,
            ),
            plan(
                PlanId::Basic,
                "Basic",
                "Small clinics and practices",
                89_900,
                895_404,
                [2, 1, 100, 5, 10, 500],
                features([true, false, false, false, false, false], BackupFrequency::None, "24h"),
                false,
            ),
            plan(
                PlanId::Professional,
                "Professional",
                "Mid-sized clinics and medical centers",
                119_900,
                1_194_202,
                [5, 3, 300, 15, 30, 2000],
                features([true, true, true, false, false, false], BackupFrequency::Weekly, "12h"),
                true,
            ),
            plan(
                PlanId::Enterprise,
                "Plus",
                "Large clinics and hospitals",
                149_900,
                1_493_004,
                [10, 5, 500, 30, 50, 5000],
                features([true, true, true, true, false, false], BackupFrequency::Daily, "4h"),
                false,
            ),
            plan(
                PlanId::Custom,
                "Business",
                "Tailored for large organizations",
                189_900,
                1_891_404,
                [unlimited, unlimited, unlimited, unlimited, unlimited, 10_000],
                features([true; 6], BackupFrequency::Daily, "24/7"),
                false,
            ),
        ];

        Self {
            plans: plans.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    /// Loads a catalog file. Accepts either a list of plans or a map keyed by
    /// plan id; the format follows the file extension.
    pub fn from_path(path: &Path) -> Result<Self, PlanCatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PlanCatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let file: CatalogFile = match extension.as_str() {
            "json" => serde_json::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            other => return Err(PlanCatalogError::UnsupportedFormat(other.to_string())),
        };

        let catalog = Self::new(file.into_plans())?;
        info!(path = %path.display(), plans = catalog.plans.len(), "Loaded plan catalog");
        Ok(catalog)
    }

    /// Catalog file named in config, or the built-in plans.
    pub fn load(config: &AppConfig) -> Result<Self, PlanCatalogError> {
        match &config.plans_file {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, id: PlanId) -> Option<&PlanDefinition> {
        self.plans.get(&id)
    }

    /// Parses and looks up a caller-supplied plan identifier.
    pub fn lookup(&self, raw: &str) -> Result<&PlanDefinition, TenancyError> {
        raw.parse::<PlanId>()
            .ok()
            .and_then(|id| self.get(id))
            .ok_or_else(|| TenancyError::UnknownPlan(raw.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = &PlanDefinition> {
        self.plans.values()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<PlanDefinition>),
    Map(BTreeMap<String, PlanDefinition>),
}

impl CatalogFile {
    fn into_plans(self) -> Vec<PlanDefinition> {
        match self {
            CatalogFile::List(plans) => plans,
            CatalogFile::Map(plans) => plans.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceType;

    #[test]
    fn builtin_catalog_has_every_plan() {
        let catalog = PlanCatalog::builtin();
        for id in PlanId::ALL {
            assert!(catalog.get(id).is_some(), "missing {}", id);
        }
        let professional = catalog.get(PlanId::Professional).unwrap();
        assert!(professional.popular);
        assert_eq!(professional.price_for(BillingCycle::Monthly), 119_900);
        assert_eq!(professional.price_for(BillingCycle::Annual), 1_194_202);
    }

    #[test]
    fn custom_plan_is_unlimited_except_storage() {
        let limits = PlanCatalog::builtin().get(PlanId::Custom).unwrap().resource_limits();
        for resource in ResourceType::ALL {
            assert_eq!(limits.limit_for(resource), None);
        }
        assert_eq!(limits.storage_limit_mb, 10_000);
    }

    #[test]
    fn lookup_rejects_unknown_plans() {
        let catalog = PlanCatalog::builtin();
        assert_eq!(catalog.lookup("Basic").unwrap().id, PlanId::Basic);
        assert!(matches!(catalog.lookup("gold"), Err(TenancyError::UnknownPlan(p)) if p == "gold"));
    }

    #[test]
    fn loads_keyed_json_catalog() {
        let path = std::env::temp_dir().join(format!("plans-{}.json", uuid::Uuid::new_v4()));
        let body = serde_json::json!({
            "free": {
                "id": "free",
                "name": "Trial",
                "priceMonthly": 0,
                "priceAnnual": 0,
                "limits": { "users": 3, "branches": 1, "consents": 10, "services": 2, "questions": 4, "storageMb": 50 },
                "features": { "customization": false }
            }
        });
        std::fs::write(&path, body.to_string()).unwrap();

        let catalog = PlanCatalog::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.all().count(), 1);
        let free = catalog.get(PlanId::Free).unwrap();
        assert_eq!(free.limits.users, 3);
        assert!(!free.features.customization);
        assert_eq!(free.features.backup, BackupFrequency::None);
        assert!(catalog.get(PlanId::Basic).is_none());
    }

    #[test]
    fn loads_yaml_list_catalog() {
        let path = std::env::temp_dir().join(format!("plans-{}.yaml", uuid::Uuid::new_v4()));
        let body = r#"
- id: basic
  name: Basic
  priceMonthly: 1000
  priceAnnual: 10000
  limits: { users: 2, branches: 1, consents: 5, services: 1, questions: 1, storageMb: 10 }
"#;
        std::fs::write(&path, body).unwrap();

        let catalog = PlanCatalog::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.lookup("basic").unwrap().price_for(BillingCycle::Annual), 10_000);
    }

    #[test]
    fn rejects_unknown_extension() {
        let path = std::env::temp_dir().join(format!("plans-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "").unwrap();
        let err = PlanCatalog::from_path(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, PlanCatalogError::UnsupportedFormat(ext) if ext == "toml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PlanCatalog::from_path(Path::new("/nonexistent/plans.json")).unwrap_err();
        assert!(matches!(err, PlanCatalogError::Io { .. }));
    }

    #[test]
    fn builtin_features_grow_with_the_plan() {
        let catalog = PlanCatalog::builtin();
        let free = &catalog.get(PlanId::Free).unwrap().features;
        assert!(free.enabled().is_empty());
        assert_eq!(free.support_response_time, "48h");

        let professional = &catalog.get(PlanId::Professional).unwrap().features;
        assert_eq!(professional.enabled(), vec!["customization", "advancedReports", "prioritySupport"]);
        assert_eq!(professional.backup, BackupFrequency::Weekly);

        let custom = &catalog.get(PlanId::Custom).unwrap().features;
        assert!(custom.white_label && custom.api_access);
        assert_eq!(custom.backup, BackupFrequency::Daily);
    }

    #[test]
    fn features_survive_json_and_yaml() {
        let enterprise = PlanCatalog::builtin().get(PlanId::Enterprise).unwrap().clone();

        let json = serde_json::to_value(&enterprise).unwrap();
        assert_eq!(json["features"]["customDomain"], true);
        assert_eq!(json["features"]["backup"], "daily");
        assert_eq!(json["features"]["supportResponseTime"], "4h");
        let from_json: PlanDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(from_json, enterprise);

        let yaml = serde_yaml::to_string(&enterprise).unwrap();
        let from_yaml: PlanDefinition = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(from_yaml.features, enterprise.features);
    }

    #[test]
    fn yaml_catalog_reads_partial_features() {
        let path = std::env::temp_dir().join(format!("plans-{}.yml", uuid::Uuid::new_v4()));
        let body = r#"
professional:
  id: professional
  name: Pro
  priceMonthly: 5000
  priceAnnual: 50000
  limits: { users: 5, branches: 3, consents: 300, services: 15, questions: 30, storageMb: 2000 }
  features:
    apiAccess: true
    backup: weekly
"#;
        std::fs::write(&path, body).unwrap();

        let catalog = PlanCatalog::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let features = &catalog.get(PlanId::Professional).unwrap().features;
        assert_eq!(features.enabled(), vec!["apiAccess"]);
        assert_eq!(features.backup, BackupFrequency::Weekly);
        assert_eq!(features.support_response_time, "");
    }
}
