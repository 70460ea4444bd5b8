use crate::cli::utils::{format_features, format_limit, format_price, output_json};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::PlanCatalog;

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let catalog = PlanCatalog::load(config)?;

    match output_format {
        OutputFormat::Json => {
            let plans: Vec<_> = catalog.all().collect();
            output_json(&plans)?;
        }
        OutputFormat::Text => {
            println!(
                "{:<14} {:<14} {:>12} {:>12} {:>10} {:>9} {:>9} {:>9} {:>10}",
                "ID", "NAME", "MONTHLY", "ANNUAL", "USERS", "BRANCHES", "CONSENTS", "SERVICES", "STORAGE MB"
            );
            println!("{}", "-".repeat(105));

            for plan in catalog.all() {
                let limits = plan.resource_limits();
                let marker = if plan.popular { "*" } else { " " };
                println!(
                    "{}{:<13} {:<14} {:>12} {:>12} {:>10} {:>9} {:>9} {:>9} {:>10}",
                    marker,
                    plan.id.as_str(),
                    plan.name,
                    format_price(plan.price_monthly),
                    format_price(plan.price_annual),
                    format_limit(limits.max_users),
                    format_limit(limits.max_branches),
                    format_limit(limits.max_consents),
                    format_limit(limits.max_services),
                    format_limit(limits.storage_limit_mb),
                );
                println!(
                    "{:<14} backup: {}, support: {}, features: {}",
                    "",
                    plan.features.backup.as_str(),
                    plan.features.support_response_time,
                    format_features(&plan.features),
                );
            }
        }
    }

    Ok(())
}
