use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Scope;

/// Bearer token claims. A missing `tenant_id` marks a platform caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, tenant_id: Option<Uuid>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: sub.into(),
            tenant_id,
            exp,
            iat: now.timestamp(),
        }
    }

    /// Scope the caller belongs to.
    pub fn affiliation(&self) -> Scope {
        Scope::from(self.tenant_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(security: &SecurityConfig, claims: &Claims) -> Result<String, JwtError> {
    let secret = &security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Issues a token for `sub`, affiliated with `tenant_id` when given.
pub fn issue_token(security: &SecurityConfig, sub: &str, tenant_id: Option<Uuid>) -> Result<String, JwtError> {
    let claims = Claims::new(sub, tenant_id, security.jwt_expiry_hours);
    generate_jwt(security, &claims)
}

pub fn validate_jwt(security: &SecurityConfig, token: &str) -> Result<Claims, JwtError> {
    let secret = &security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn tokens_round_trip_affiliation() {
        let security = AppConfig::development().security;
        let tenant = Uuid::new_v4();

        let token = issue_token(&security, "ana", Some(tenant)).unwrap();
        let claims = validate_jwt(&security, &token).unwrap();
        assert_eq!(claims.sub, "ana");
        assert_eq!(claims.affiliation(), Scope::Tenant(tenant));

        let root = issue_token(&security, "root", None).unwrap();
        assert_eq!(validate_jwt(&security, &root).unwrap().affiliation(), Scope::Global);
    }

    #[test]
    fn rejects_foreign_signatures_and_missing_secret() {
        let security = AppConfig::development().security;
        let mut other = security.clone();
        other.jwt_secret = "another-secret".to_string();

        let token = issue_token(&other, "ana", None).unwrap();
        assert!(matches!(validate_jwt(&security, &token), Err(JwtError::InvalidToken(_))));

        let mut empty = security.clone();
        empty.jwt_secret.clear();
        assert!(matches!(issue_token(&empty, "ana", None), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let security = AppConfig::development().security;
        let mut claims = Claims::new("ana", None, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&security, &claims).unwrap();
        assert!(validate_jwt(&security, &token).is_err());
    }
}
