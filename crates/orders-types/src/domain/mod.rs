pub mod order;
pub mod pagination;
pub mod product;
pub mod status;
