use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::services::PlanFeatures;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Pretty-print any serializable value as JSON
pub fn output_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Minor currency units as a grouped whole amount, e.g. 119900 -> "119,900".
pub fn format_price(minor_units: i64) -> String {
    let digits = minor_units.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if minor_units < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Limit column for text tables: negative limits print as "unlimited".
pub fn format_limit(limit: i32) -> String {
    if limit < 0 {
        "unlimited".to_string()
    } else {
        limit.to_string()
    }
}

/// Enabled plan features as a comma list, or "-" when none are.
pub fn format_features(features: &PlanFeatures) -> String {
    let enabled = features.enabled();
    if enabled.is_empty() {
        "-".to_string()
    } else {
        enabled.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_are_grouped_by_thousands() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(89_900), "89,900");
        assert_eq!(format_price(1_194_202), "1,194,202");
        assert_eq!(format_price(-1_000), "-1,000");
    }

    #[test]
    fn negative_limits_print_as_unlimited() {
        assert_eq!(format_limit(-1), "unlimited");
        assert_eq!(format_limit(0), "0");
        assert_eq!(format_limit(30), "30");
    }

    #[test]
    fn features_list_only_enabled_flags() {
        assert_eq!(format_features(&PlanFeatures::default()), "-");
        let features = PlanFeatures {
            customization: true,
            api_access: true,
            ..Default::default()
        };
        assert_eq!(format_features(&features), "customization, apiAccess");
    }
}
