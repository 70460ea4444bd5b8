// handlers/elevated/root/tenant/mod.rs - Tenant management handlers

pub mod create; // POST /api/root/tenants
pub mod delete; // DELETE /api/root/tenants/:id
pub mod list;   // GET /api/root/tenants
pub mod show;   // GET /api/root/tenants/:id
pub mod update; // PUT .../plan, .../limits, .../billing-day; POST .../suspend, .../activate

pub use create::tenant_create;
pub use delete::tenant_delete;
pub use list::tenant_list;
pub use show::tenant_show;
pub use update::{
    tenant_activate, tenant_billing_day, tenant_limits, tenant_plan, tenant_suspend,
};
