use serde::Serialize;
use std::net::IpAddr;

use crate::config::TenancyConfig;

/// Outcome of resolving a request host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "slug", rename_all = "lowercase")]
pub enum TenantScope {
    /// No tenant: the platform administration / global scope
    Platform,
    Tenant(String),
}

/// Derives a tenant slug from the leftmost label of a host name.
///
/// Pure string logic, no lookups. The admin label always maps to the
/// platform scope, even if a tenant was provisioned under that slug.
#[derive(Debug, Clone)]
pub struct HostResolver {
    admin_label: String,
    reserved: Vec<String>,
}

impl Default for HostResolver {
    fn default() -> Self {
        Self::new("admin", Vec::<String>::new())
    }
}

impl HostResolver {
    pub fn new(admin_label: impl Into<String>, reserved: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            admin_label: admin_label.into().to_ascii_lowercase(),
            reserved: reserved
                .into_iter()
                .map(|label| label.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.admin_label.clone(), config.reserved_labels.clone())
    }

    pub fn admin_label(&self) -> &str {
        &self.admin_label
    }

    /// Labels that can never name a tenant.
    pub fn is_reserved(&self, label: &str) -> bool {
        label.eq_ignore_ascii_case(&self.admin_label)
            || self.reserved.iter().any(|r| label.eq_ignore_ascii_case(r))
    }

    pub fn resolve(&self, host: &str) -> TenantScope {
        let hostname = strip_port(host.trim()).trim_end_matches('.');

        if hostname.is_empty()
            || hostname.eq_ignore_ascii_case("localhost")
            || hostname.parse::<IpAddr>().is_ok()
        {
            return TenantScope::Platform;
        }

        let labels: Vec<&str> = hostname.split('.').collect();
        let leftmost = labels[0];

        if self.is_reserved(leftmost) {
            return TenantScope::Platform;
        }

        if labels.len() >= 2 && !leftmost.is_empty() {
            return TenantScope::Tenant(leftmost.to_ascii_lowercase());
        }

        TenantScope::Platform
    }

    /// Slug supplied out-of-band (e.g. `X-Tenant-Slug`), subject to the same
    /// reservation rules as a host label.
    pub fn resolve_slug(&self, raw: &str) -> TenantScope {
        let slug = raw.trim();
        if slug.is_empty() || self.is_reserved(slug) {
            TenantScope::Platform
        } else {
            TenantScope::Tenant(slug.to_ascii_lowercase())
        }
    }
}

/// Resolve with the default `admin` reservation only.
pub fn resolve_host(host: &str) -> TenantScope {
    HostResolver::default().resolve(host)
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => rest,
        };
    }

    match host.rsplit_once(':') {
        // A second colon means an unbracketed IPv6 literal, not a port.
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
