use std::collections::HashMap;

use crate::errors::AppError;
use orders_types::domain::order::{
    distinct_product_ids, validate_line_items, LineItem, MissingProduct, NewOrder, Order,
    OrderView, PricingError,
};
use orders_types::domain::pagination::{last_page, OrderPage, PageMeta, PageRequest};
use orders_types::domain::product::{index_by_id, ProductDetail};
use orders_types::domain::status::{OrderStatus, TransitionPolicy};
use orders_types::ports::order_repository::OrderRepository;
use orders_types::ports::product_validator::ProductValidator;
use tracing::instrument;
use uuid::Uuid;

type Catalog = HashMap<String, ProductDetail>;

/// Order workflow: pricing against the catalog, persistence, enrichment and
/// status changes. Holds no mutable state; share it behind an `Arc`.
pub struct OrderService<R: OrderRepository, P: ProductValidator> {
    repo: R,
    products: P,
    policy: TransitionPolicy,
}

fn order_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("order with id {id} not found"))
}

fn items_not_found(id: Uuid, reason: impl std::fmt::Display) -> AppError {
    tracing::warn!(order_id = %id, %reason, "order items failed catalog validation");
    AppError::NotFound("some item in order is not found".into())
}

impl<R: OrderRepository, P: ProductValidator> OrderService<R, P> {
    pub fn new(repo: R, products: P) -> Self {
        Self {
            repo,
            products,
            policy: TransitionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    #[instrument(name = "orders::create", skip(self, items), fields(line_items = items.len()))]
    pub async fn create_order(&self, items: Vec<LineItem>) -> Result<OrderView, AppError> {
        validate_line_items(&items)?;

        let ids = distinct_product_ids(items.iter().map(|it| it.product_id.as_str()));
        let products = self.products.validate_products(&ids).await.map_err(|e| {
            tracing::warn!(error = %e, "catalog rejected order");
            AppError::from(e)
        })?;
        let catalog = index_by_id(products);

        let priced = NewOrder::price(&items, &catalog).map_err(|e| match e {
            PricingError::Overflow => AppError::Validation(PricingError::Overflow.to_string()),
            other => {
                tracing::error!(error = %other, "catalog answer inconsistent with request");
                AppError::Internal(other.into())
            }
        })?;

        let order = self.repo.create_with_items(priced).await.map_err(|e| {
            tracing::error!(error = %e, "order insert rolled back");
            AppError::from(e)
        })?;
        tracing::info!(
            order_id = %order.id,
            total_amount = order.total_amount,
            total_items = order.total_items,
            "order created"
        );

        order
            .enrich(&catalog)
            .map_err(|e: MissingProduct| AppError::Internal(e.into()))
    }

    #[instrument(name = "orders::find_one", skip(self), fields(order_id = %id))]
    pub async fn find_one(&self, id: Uuid) -> Result<OrderView, AppError> {
        let (order, catalog) = self.load(id).await?;
        order.enrich(&catalog).map_err(|e| items_not_found(id, e))
    }

    #[instrument(name = "orders::find_all", skip(self))]
    pub async fn find_all(&self, page: PageRequest) -> Result<OrderPage, AppError> {
        let (data, total) = self.repo.find_page(page).await?;
        Ok(OrderPage {
            meta: PageMeta {
                page: page.page,
                status: page.status,
                total_orders: total,
                last_page: last_page(total, page.limit),
            },
            data,
        })
    }

    /// Moves an order to `status`. Re-applying the current status is a no-op
    /// that performs no write. Concurrent changes are last-writer-wins.
    #[instrument(name = "orders::change_status", skip(self), fields(order_id = %id))]
    pub async fn change_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, AppError> {
        let (order, catalog) = self.load(id).await?;
        if order.status == status {
            tracing::debug!(%status, "status unchanged");
            return order.enrich(&catalog).map_err(|e| items_not_found(id, e));
        }

        let from = order.status;
        self.policy.check(from, status)?;

        let updated = self
            .repo
            .update_status(id, status)
            .await?
            .ok_or_else(|| order_not_found(id))?;
        tracing::info!(%from, to = %status, "order status changed");
        updated.enrich(&catalog).map_err(|e| items_not_found(id, e))
    }

    /// Fetches an order and the current catalog entries for its items.
    async fn load(&self, id: Uuid) -> Result<(Order, Catalog), AppError> {
        let order = self.repo.find_by_id(id).await?.ok_or_else(|| {
            tracing::warn!(order_id = %id, "order not found");
            order_not_found(id)
        })?;

        let ids = order.product_ids();
        if ids.is_empty() {
            return Ok((order, Catalog::new()));
        }
        let products = self
            .products
            .validate_products(&ids)
            .await
            .map_err(|e| items_not_found(id, e))?;
        Ok((order, index_by_id(products)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::products::InMemoryCatalog;
    use orders_repo::memory::InMemoryRepo;

    fn product(id: &str, name: &str, price: i64) -> ProductDetail {
        ProductDetail {
            id: id.into(),
            name: name.into(),
            price,
        }
    }

    fn line(id: &str, quantity: u32) -> LineItem {
        LineItem {
            product_id: id.into(),
            quantity,
        }
    }

    fn service() -> (
        OrderService<InMemoryRepo, InMemoryCatalog>,
        InMemoryRepo,
        InMemoryCatalog,
    ) {
        let repo = InMemoryRepo::new();
        let catalog = InMemoryCatalog::with_products([
            product("p1", "Widget", 10),
            product("p2", "Gadget", 5),
        ]);
        let svc = OrderService::new(repo.clone(), catalog.clone());
        (svc, repo, catalog)
    }

    #[tokio::test]
    async fn create_prices_from_catalog_and_enriches() {
        let (svc, _, catalog) = service();
        catalog.upsert(product("p1", "Widget", 7));

        let order = svc.create_order(vec![line("p1", 3)]).await.unwrap();
        assert_eq!(order.total_amount, 21);
        assert_eq!(order.total_items, 3);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order_item.len(), 1);
        let item = &order.order_item[0];
        assert_eq!(item.product_id, "p1");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.price, 7);
        assert_eq!(item.name, "Widget");
    }

    #[tokio::test]
    async fn totals_sum_every_line() {
        let (svc, _, _) = service();
        for (q1, q2) in [(1, 1), (2, 7), (13, 4)] {
            let order = svc
                .create_order(vec![line("p1", q1), line("p2", q2)])
                .await
                .unwrap();
            assert_eq!(order.total_amount, 10 * i64::from(q1) + 5 * i64::from(q2));
            assert_eq!(order.total_items, i64::from(q1 + q2));
        }
    }

    #[tokio::test]
    async fn catalog_failures_persist_nothing() {
        let (svc, repo, catalog) = service();

        let missing = svc.create_order(vec![line("p1", 1), line("nope", 1)]).await;
        assert!(matches!(missing, Err(AppError::ProductNotFound(_))));

        catalog.set_offline(true);
        let offline = svc.create_order(vec![line("p1", 1)]).await;
        assert!(matches!(offline, Err(AppError::ValidatorUnavailable(_))));

        assert_eq!(repo.count_by_status(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn validation_errors_propagate_before_io() {
        let (svc, _, catalog) = service();
        let empty = svc.create_order(vec![]).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
        let zero = svc.create_order(vec![line("p1", 0)]).await;
        assert!(matches!(zero, Err(AppError::Validation(_))));
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn find_one_keeps_frozen_price_and_refreshes_name() {
        let (svc, _, catalog) = service();
        let created = svc.create_order(vec![line("p1", 2)]).await.unwrap();

        catalog.upsert(product("p1", "Widget Pro", 20));
        let fetched = svc.find_one(created.id).await.unwrap();
        assert_eq!(fetched.order_item[0].price, 10);
        assert_eq!(fetched.order_item[0].name, "Widget Pro");
        assert_eq!(fetched.total_amount, 20);
    }

    #[tokio::test]
    async fn not_found_paths() {
        let (svc, _, catalog) = service();
        let missing = svc.find_one(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let updated = svc
            .change_status(Uuid::new_v4(), OrderStatus::Confirmed)
            .await;
        assert!(matches!(updated, Err(AppError::NotFound(_))));

        let created = svc.create_order(vec![line("p2", 1)]).await.unwrap();
        catalog.remove("p2");
        let orphaned = svc.find_one(created.id).await;
        match orphaned {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "some item in order is not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn change_status_moves_and_reports() {
        let (svc, _, _) = service();
        let created = svc.create_order(vec![line("p1", 1)]).await.unwrap();

        let confirmed = svc
            .change_status(created.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(confirmed.order_item[0].name, "Widget");

        // Permissive by default: moving backwards is accepted.
        let back = svc
            .change_status(created.id, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(back.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn linear_policy_rejects_skips() {
        let (_, repo, catalog) = service();
        let svc = OrderService::new(repo, catalog).with_policy(TransitionPolicy::Linear);
        let created = svc.create_order(vec![line("p1", 1)]).await.unwrap();

        let skipped = svc.change_status(created.id, OrderStatus::Delivered).await;
        assert!(matches!(skipped, Err(AppError::InvalidTransition(_))));

        svc.change_status(created.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        let delivered = svc
            .change_status(created.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn find_all_paginates_with_meta() {
        let (svc, _, _) = service();
        for _ in 0..5 {
            svc.create_order(vec![line("p2", 1)]).await.unwrap();
        }

        let page = svc
            .find_all(PageRequest::new(Some(2), Some(2), None).unwrap())
            .await
            .unwrap();
        assert_eq!(page.meta.total_orders, 5);
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.data.len(), 2);

        let beyond = svc
            .find_all(PageRequest::new(Some(4), Some(2), None).unwrap())
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.meta.total_orders, 5);

        let delivered = svc
            .find_all(PageRequest::new(None, None, Some(OrderStatus::Delivered)).unwrap())
            .await
            .unwrap();
        assert_eq!(delivered.meta.total_orders, 0);
        assert_eq!(delivered.meta.last_page, 0);
        assert_eq!(delivered.meta.status, Some(OrderStatus::Delivered));
    }
}
