use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use orders_types::domain::order::distinct_product_ids;
use orders_types::domain::product::ProductDetail;
use orders_types::ports::product_validator::{ProductValidator, ValidatorError};

/// Catalog held in process, for local runs and tests.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<DashMap<String, ProductDetail>>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = ProductDetail>) -> Self {
        let catalog = Self::new();
        for p in products {
            catalog.upsert(p);
        }
        catalog
    }

    pub fn upsert(&self, product: ProductDetail) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn remove(&self, id: &str) -> Option<ProductDetail> {
        self.products.remove(id).map(|(_, p)| p)
    }

    /// Makes every following call fail as if the service were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductValidator for InMemoryCatalog {
    async fn validate_products(
        &self,
        ids: &[String],
    ) -> Result<Vec<ProductDetail>, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(ValidatorError::Unavailable("catalog offline".into()));
        }
        let distinct = distinct_product_ids(ids.iter().map(String::as_str));
        if distinct.is_empty() {
            return Err(ValidatorError::EmptyRequest);
        }

        let mut found = Vec::with_capacity(distinct.len());
        let mut missing = Vec::new();
        for id in distinct {
            match self.products.get(&id) {
                Some(p) => found.push(p.clone()),
                None => missing.push(id),
            }
        }
        if !missing.is_empty() {
            return Err(ValidatorError::ProductNotFound(missing));
        }
        Ok(found)
    }
}
