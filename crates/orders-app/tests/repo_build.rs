#![cfg(feature = "sqlite")]

use orders_repo::{build_repo, Repo};
use orders_types::domain::order::{NewOrder, NewOrderItem};
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::OrderRepository;

#[tokio::test]
async fn builds_sqlite_repo_and_persists_across_reopen() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("orders-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repo: Repo = build_repo(Some(&url)).await.expect("build repo");
    assert!(matches!(repo, Repo::Sqlite(_)));
    assert_eq!(repo.count_by_status(None).await.expect("count"), 0);

    let created = repo
        .create_with_items(NewOrder {
            total_amount: 30,
            total_items: 3,
            status: OrderStatus::Pending,
            items: vec![NewOrderItem {
                product_id: "p1".into(),
                quantity: 3,
                price: 10,
            }],
        })
        .await
        .expect("create");
    repo.close().await;

    let reopened = build_repo(Some(&url)).await.expect("reopen repo");
    let fetched = reopened
        .find_by_id(created.id)
        .await
        .expect("find")
        .expect("order persisted");
    assert_eq!(fetched.total_amount, 30);
    assert_eq!(fetched.items[0].price, 10);
    reopened.close().await;
}
