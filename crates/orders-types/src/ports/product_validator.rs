use async_trait::async_trait;

use crate::domain::product::ProductDetail;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("products not found: {}", .0.join(", "))]
    ProductNotFound(Vec<String>),
    #[error("product service unavailable: {0}")]
    Unavailable(String),
    #[error("no product ids to validate")]
    EmptyRequest,
}

/// Remote catalog lookup. Callers decide whether to retry; adapters never do.
#[async_trait]
pub trait ProductValidator: Send + Sync + 'static {
    /// Returns one detail per distinct id in `ids`, in no particular order.
    async fn validate_products(&self, ids: &[String]) -> Result<Vec<ProductDetail>, ValidatorError>;
}
