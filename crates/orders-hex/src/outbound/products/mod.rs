pub mod http;
pub mod memory;

pub use http::{HttpProductValidator, HttpProductValidatorBuilder};
pub use memory::InMemoryCatalog;
