use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A product as reported by the catalog service. Never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDetail {
    pub id: String,
    pub name: String,
    /// Current catalog price in minor units.
    pub price: i64,
}

/// Index catalog answers by product id for constant-time lookups.
pub fn index_by_id(products: Vec<ProductDetail>) -> HashMap<String, ProductDetail> {
    products.into_iter().map(|p| (p.id.clone(), p)).collect()
}
