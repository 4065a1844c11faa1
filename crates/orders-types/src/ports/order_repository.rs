use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{NewOrder, Order, OrderSummary};
use crate::domain::pagination::PageRequest;
use crate::domain::status::OrderStatus;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    Db(String),
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Transactional persistence boundary for orders and their items.
///
/// Concurrent status updates against one order are last-writer-wins; the
/// adapters add no locking beyond what the store gives a single statement.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Writes the order and every item atomically. Nothing is visible on error.
    async fn create_with_items(&self, order: NewOrder) -> Result<Order, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepoError>;
    /// One page of order headers plus the total number of matching orders.
    async fn find_page(&self, page: PageRequest) -> Result<(Vec<OrderSummary>, u64), RepoError>;
    async fn count_by_status(&self, status: Option<OrderStatus>) -> Result<u64, RepoError>;
    /// `Ok(None)` when no order with `id` exists.
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError>;
}

#[async_trait]
impl<T: OrderRepository> OrderRepository for Arc<T> {
    async fn create_with_items(&self, order: NewOrder) -> Result<Order, RepoError> {
        (**self).create_with_items(order).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        (**self).find_by_id(id).await
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<OrderSummary>, u64), RepoError> {
        (**self).find_page(page).await
    }

    async fn count_by_status(&self, status: Option<OrderStatus>) -> Result<u64, RepoError> {
        (**self).count_by_status(status).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        (**self).update_status(id, status).await
    }
}
