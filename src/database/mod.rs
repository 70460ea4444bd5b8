pub mod error;
pub mod manager;
pub mod memory;
pub mod models;
pub mod retry;
pub mod settings;
pub mod store;
pub mod tenants;
pub mod usage;

pub use error::StoreError;
pub use manager::{DatabaseManager, QueryBudget};
pub use memory::MemoryStore;
pub use retry::{retry_idempotent, RetryPolicy};
pub use settings::PgSettingsStore;
pub use store::{SettingsStore, TenantStore, UsageCounter};
pub use tenants::PgTenantStore;
pub use usage::PgUsageCounter;
