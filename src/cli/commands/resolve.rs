use serde_json::json;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::resolver::{HostResolver, TenantScope};

pub fn handle(config: &AppConfig, host: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let resolver = HostResolver::from_config(&config.tenancy);
    let scope = resolver.resolve(host);

    match output_format {
        OutputFormat::Json => output_json(&json!({ "host": host, "scope": scope }))?,
        OutputFormat::Text => match scope {
            TenantScope::Platform => println!(
                "{} -> platform (admin host: {}.{})",
                host,
                resolver.admin_label(),
                config.tenancy.base_domain
            ),
            TenantScope::Tenant(slug) => println!("{} -> tenant '{}'", host, slug),
        },
    }

    Ok(())
}
