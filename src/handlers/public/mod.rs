// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Every route except /health still runs inside host resolution, so unknown
// and suspended tenants are rejected before these handlers run.

pub mod health;          // GET /health
pub mod plans;           // GET /api/plans
pub mod settings_public; // GET /api/settings/public

pub use health::health;
pub use plans::plans_list;
pub use settings_public::settings_public;
