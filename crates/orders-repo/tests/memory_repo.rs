#![cfg(feature = "memory")]

use orders_repo::memory::InMemoryRepo;
use orders_types::domain::order::{NewOrder, NewOrderItem};
use orders_types::domain::pagination::PageRequest;
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::OrderRepository;

fn new_order(product_id: &str, quantity: u32, price: i64) -> NewOrder {
    NewOrder {
        total_amount: price * i64::from(quantity),
        total_items: i64::from(quantity),
        status: OrderStatus::Pending,
        items: vec![NewOrderItem {
            product_id: product_id.into(),
            quantity,
            price,
        }],
    }
}

#[tokio::test]
async fn memory_repo_create_find_update_flow() {
    let repo = InMemoryRepo::new();

    let created = repo.create_with_items(new_order("p1", 2, 500)).await.unwrap();
    assert_eq!(created.total_amount, 1000);
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].order_id, created.id);

    let fetched = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);

    let updated = repo
        .update_status(created.id, OrderStatus::Confirmed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(updated.items[0].price, 500);

    assert_eq!(repo.count_by_status(None).await.unwrap(), 1);
    assert_eq!(
        repo.count_by_status(Some(OrderStatus::Pending)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn memory_repo_pages_in_creation_order() {
    let repo = InMemoryRepo::new();
    let mut ids = Vec::new();
    for i in 0..5 {
        let o = repo
            .create_with_items(new_order("p1", 1, 100 + i))
            .await
            .unwrap();
        ids.push(o.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    repo.update_status(ids[1], OrderStatus::Delivered)
        .await
        .unwrap();

    let (first, total) = repo
        .find_page(PageRequest::new(Some(1), Some(2), None).unwrap())
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(first.iter().map(|o| o.id).collect::<Vec<_>>(), ids[..2]);

    let (last, _) = repo
        .find_page(PageRequest::new(Some(3), Some(2), None).unwrap())
        .await
        .unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].id, ids[4]);

    let (delivered, total) = repo
        .find_page(PageRequest::new(None, None, Some(OrderStatus::Delivered)).unwrap())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(delivered[0].id, ids[1]);

    let (beyond, total) = repo
        .find_page(PageRequest::new(Some(9), Some(2), None).unwrap())
        .await
        .unwrap();
    assert!(beyond.is_empty());
    assert_eq!(total, 5);
}

#[tokio::test]
async fn memory_repo_handles_missing_rows() {
    let repo = InMemoryRepo::new();
    let missing = repo.find_by_id(uuid::Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());

    let updated = repo
        .update_status(uuid::Uuid::new_v4(), OrderStatus::Delivered)
        .await
        .unwrap();
    assert!(updated.is_none());
}

#[tokio::test]
async fn memory_repo_far_page_is_empty_with_total() {
    let repo = InMemoryRepo::new();
    repo.create_with_items(new_order("p1", 1, 100)).await.unwrap();

    let far = PageRequest::new(Some(u32::MAX), Some(u32::MAX), None).unwrap();
    let (page, total) = repo.find_page(far).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 1);
}
