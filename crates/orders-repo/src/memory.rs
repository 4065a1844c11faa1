use async_trait::async_trait;
use dashmap::DashMap;
use orders_types::domain::order::{NewOrder, Order, OrderSummary};
use orders_types::domain::pagination::PageRequest;
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::{OrderRepository, RepoError};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryRepo {
    pub map: Arc<DashMap<Uuid, Order>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            map: Arc::new(DashMap::new()),
        }
    }

    fn matching(&self, status: Option<OrderStatus>) -> Vec<OrderSummary> {
        self.map
            .iter()
            .filter(|kv| status.map_or(true, |s| kv.value().status == s))
            .map(|kv| kv.value().summary())
            .collect()
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn create_with_items(&self, order: NewOrder) -> Result<Order, RepoError> {
        // A single insert publishes the order together with its items.
        let order = Order::from_new(order);
        self.map.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.map.get(&id).map(|r| r.clone()))
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<OrderSummary>, u64), RepoError> {
        let mut rows = self.matching(page.status);
        let total = rows.len() as u64;
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let data = rows
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .collect();
        Ok((data, total))
    }

    async fn count_by_status(&self, status: Option<OrderStatus>) -> Result<u64, RepoError> {
        Ok(self
            .map
            .iter()
            .filter(|kv| status.map_or(true, |s| kv.value().status == s))
            .count() as u64)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        if let Some(mut v) = self.map.get_mut(&id) {
            v.update_status(status);
            return Ok(Some(v.clone()));
        }
        Ok(None)
    }
}
