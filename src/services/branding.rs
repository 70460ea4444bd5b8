use serde::Serialize;
use std::collections::BTreeMap;

/// Branding and contact values shown to unauthenticated visitors.
///
/// Built by overlaying one scope's rows on fixed defaults. Empty stored
/// values fall back to the default, and numeric fields that fail to parse do
/// too.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub logo_url: Option<String>,
    pub footer_logo_url: Option<String>,
    pub watermark_logo_url: Option<String>,
    pub favicon_url: Option<String>,

    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub text_color: String,
    pub link_color: String,
    pub border_color: String,

    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_email: String,
    pub company_website: String,

    pub logo_size: i64,
    pub logo_position: String,
    pub watermark_opacity: f64,

    pub footer_text: String,
    pub procedure_title: String,
    pub data_treatment_title: String,
    pub image_rights_title: String,
}

impl Default for PublicSettings {
    fn default() -> Self {
        Self {
            logo_url: None,
            footer_logo_url: None,
            watermark_logo_url: None,
            favicon_url: None,
            primary_color: "#3B82F6".to_string(),
            secondary_color: "#10B981".to_string(),
            accent_color: "#F59E0B".to_string(),
            text_color: "#1F2937".to_string(),
            link_color: "#3B82F6".to_string(),
            border_color: "#D1D5DB".to_string(),
            company_name: "Consent Management System".to_string(),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: String::new(),
            company_website: String::new(),
            logo_size: 60,
            logo_position: "left".to_string(),
            watermark_opacity: 0.1,
            footer_text: String::new(),
            procedure_title: "PROCEDURE CONSENT".to_string(),
            data_treatment_title: "CONSENT TO PERSONAL DATA PROCESSING".to_string(),
            image_rights_title: "EXPRESS CONSENT TO USE OF PERSONAL IMAGES".to_string(),
        }
    }
}

impl PublicSettings {
    pub fn from_rows(rows: &BTreeMap<String, String>) -> Self {
        let mut settings = Self::default();
        let value = |key: &str| rows.get(key).map(|v| v.as_str()).filter(|v| !v.is_empty());
        let text = |key: &str, target: &mut String| {
            if let Some(v) = value(key) {
                *target = v.to_string();
            }
        };

        settings.logo_url = value("logoUrl").map(str::to_string);
        settings.footer_logo_url = value("footerLogoUrl").map(str::to_string);
        settings.watermark_logo_url = value("watermarkLogoUrl").map(str::to_string);
        settings.favicon_url = value("faviconUrl").map(str::to_string);

        text("primaryColor", &mut settings.primary_color);
        text("secondaryColor", &mut settings.secondary_color);
        text("accentColor", &mut settings.accent_color);
        text("textColor", &mut settings.text_color);
        text("linkColor", &mut settings.link_color);
        text("borderColor", &mut settings.border_color);

        text("companyName", &mut settings.company_name);
        text("companyAddress", &mut settings.company_address);
        text("companyPhone", &mut settings.company_phone);
        text("companyEmail", &mut settings.company_email);
        text("companyWebsite", &mut settings.company_website);

        if let Some(size) = value("logoSize").and_then(|v| v.trim().parse().ok()).filter(|s| *s > 0) {
            settings.logo_size = size;
        }
        text("logoPosition", &mut settings.logo_position);
        if let Some(opacity) = value("watermarkOpacity")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|o| *o > 0.0)
        {
            settings.watermark_opacity = opacity;
        }

        text("footerText", &mut settings.footer_text);
        text("procedureTitle", &mut settings.procedure_title);
        text("dataTreatmentTitle", &mut settings.data_treatment_title);
        text("imageRightsTitle", &mut settings.image_rights_title);

        settings
    }

    /// Non-empty defaults as storable rows, used when a scope is reset
    /// without explicit values.
    pub fn default_entries() -> BTreeMap<String, String> {
        let defaults = Self::default();
        [
            ("primaryColor", defaults.primary_color),
            ("secondaryColor", defaults.secondary_color),
            ("accentColor", defaults.accent_color),
            ("textColor", defaults.text_color),
            ("linkColor", defaults.link_color),
            ("borderColor", defaults.border_color),
            ("companyName", defaults.company_name),
            ("logoSize", defaults.logo_size.to_string()),
            ("logoPosition", defaults.logo_position),
            ("watermarkOpacity", defaults.watermark_opacity.to_string()),
            ("procedureTitle", defaults.procedure_title),
            ("dataTreatmentTitle", defaults.data_treatment_title),
            ("imageRightsTitle", defaults.image_rights_title),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn stored_rows_override_defaults() {
        let settings = PublicSettings::from_rows(&rows(&[
            ("companyName", "Clinica Norte"),
            ("primaryColor", "#000000"),
            ("logoUrl", "https://cdn.example.com/logo.png"),
            ("logoSize", "80"),
            ("unrelated", "ignored"),
        ]));
        assert_eq!(settings.company_name, "Clinica Norte");
        assert_eq!(settings.primary_color, "#000000");
        assert_eq!(settings.logo_url.as_deref(), Some("https://cdn.example.com/logo.png"));
        assert_eq!(settings.logo_size, 80);
        assert_eq!(settings.secondary_color, "#10B981");
    }

    #[test]
    fn empty_and_unparsable_values_fall_back() {
        let settings = PublicSettings::from_rows(&rows(&[
            ("companyName", ""),
            ("logoSize", "big"),
            ("watermarkOpacity", "0"),
            ("faviconUrl", ""),
        ]));
        assert_eq!(settings, PublicSettings::default());
    }

    #[test]
    fn default_entries_round_trip_to_defaults() {
        let settings = PublicSettings::from_rows(&PublicSettings::default_entries());
        assert_eq!(settings, PublicSettings::default());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(PublicSettings::default()).unwrap();
        assert_eq!(json["primaryColor"], "#3B82F6");
        assert!(json["logoUrl"].is_null());
        assert_eq!(json["logoSize"], 60);
    }
}
