pub mod auth;
pub mod cache;
pub mod response;
pub mod tenant_scope;

pub use auth::{authorize_scope, require_caller, require_platform, Caller};
pub use cache::{cache_responses, ResponseCache};
pub use response::{ApiResponse, ApiResult};
pub use tenant_scope::{resolve_scope, RequestScope, TENANT_SLUG_HEADER};
