use serde_json::json;
use uuid::Uuid;

use crate::auth::issue_token;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(config: &AppConfig, sub: &str, tenant: Option<Uuid>, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = issue_token(&config.security, sub, tenant)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "sub": sub,
                "tenant_id": tenant,
                "expires_in_hours": config.security.jwt_expiry_hours,
            })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
