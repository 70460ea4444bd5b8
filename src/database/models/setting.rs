use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Scope;

/// One key/value row of a scope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedSetting {
    pub key: String,
    pub value: String,
    pub scope: Scope,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct SettingRow {
    pub key: String,
    pub value: String,
    pub tenant_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingRow> for ScopedSetting {
    fn from(row: SettingRow) -> Self {
        ScopedSetting {
            key: row.key,
            value: row.value,
            scope: Scope::from(row.tenant_id),
            updated_at: row.updated_at,
        }
    }
}
