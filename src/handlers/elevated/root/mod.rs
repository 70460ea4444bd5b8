// handlers/elevated/root/mod.rs - Root administrative handlers

pub mod stats; // GET /api/root/stats
pub mod tenant; // Tenant directory administration

pub use stats::platform_stats;
pub use tenant::*;
