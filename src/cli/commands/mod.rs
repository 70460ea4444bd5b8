pub mod plans;
pub mod resolve;
pub mod server;
pub mod token;
