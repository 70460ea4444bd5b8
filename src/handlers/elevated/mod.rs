// handlers/elevated/mod.rs - Elevated handlers (platform callers only)
//
// Routes under /api/root/* are reachable only from the platform host with a
// token that carries no tenant affiliation.

pub mod root;

pub use root::*;
