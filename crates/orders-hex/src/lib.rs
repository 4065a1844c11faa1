//! orders-hex: hexagonal Orders service library (workflow core, inbound HTTP,
//! outbound product catalog)

pub mod config;
pub mod errors;

pub mod application;

pub use orders_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
pub mod outbound; // product catalog adapters
