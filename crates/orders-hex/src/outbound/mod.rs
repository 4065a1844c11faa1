//! Outbound adapters: collaborators this service calls.

pub mod products;
