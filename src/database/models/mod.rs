pub mod setting;
pub mod tenant;

pub use setting::ScopedSetting;
pub use tenant::{NewTenant, PlanAssignment, Tenant, TENANT_SLUG_INDEX};
