//! orders-types: domain model and ports shared by the orders crates

pub mod domain;
pub mod ports;
