// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// `require_caller` has already checked that the caller belongs to the
// resolved request scope, so handlers act on `RequestScope::scope` directly.

pub mod quota;    // GET /api/quota/:resource, GET /api/usage
pub mod settings; // /api/settings, /api/settings/:key, /api/settings/reset

pub use quota::{quota_check, usage_get};
pub use settings::{settings_bulk_put, settings_get, settings_list, settings_put, settings_reset};
