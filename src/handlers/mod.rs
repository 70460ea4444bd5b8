// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (scope resolved, no auth) → Protected (bearer token in the request
// scope) → Elevated (platform callers only, /api/root/*)
pub mod public;    // Tier 1: /health, /api/plans, /api/settings/public
pub mod protected; // Tier 2: /api/settings/*, /api/quota/*, /api/usage
pub mod elevated;  // Tier 3: /api/root/*

pub use public::*;
pub use protected::*;
pub use elevated::*;
