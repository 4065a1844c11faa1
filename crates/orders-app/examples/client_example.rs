///  To run :
///  cargo r --example client_example
use orders_client::{ApiError, FindAllOrders, OrdersClient};
use orders_hex::application::order_service::OrderService;
use orders_hex::inbound::http::{HttpServer, HttpServerConfig};
use orders_hex::outbound::products::InMemoryCatalog;
use orders_repo::build_repo;
use orders_types::domain::order::LineItem;
use orders_types::domain::product::ProductDetail;
use orders_types::domain::status::OrderStatus;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Start server on ephemeral port with a local catalog standing in for the product service.
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("orders.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    let catalog = InMemoryCatalog::with_products([
        ProductDetail {
            id: "p1".into(),
            name: "Widget".into(),
            price: 700,
        },
        ProductDetail {
            id: "p2".into(),
            name: "Gadget".into(),
            price: 250,
        },
    ]);
    let service = OrderService::new(repo, catalog.clone());
    let server = HttpServer::new(
        service,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    // Use client against the running server.
    let client = OrdersClient::new(&addr)?;
    let created = client
        .create_order(vec![
            LineItem {
                product_id: "p1".into(),
                quantity: 3,
            },
            LineItem {
                product_id: "p2".into(),
                quantity: 2,
            },
        ])
        .await?;
    println!(
        "Created order id={} total={} items={}",
        created.id, created.total_amount, created.total_items
    );
    assert_eq!(created.status, OrderStatus::Pending);

    // A later price change does not touch the stored order.
    catalog.upsert(ProductDetail {
        id: "p1".into(),
        name: "Widget (2nd gen)".into(),
        price: 900,
    });
    let fetched = client.find_one(created.id).await?;
    for item in &fetched.order_item {
        println!("  {} x{} @ {}", item.name, item.quantity, item.price);
    }

    let updated = client
        .change_status(created.id, OrderStatus::Confirmed)
        .await?;
    println!("Updated status={} for id {}", updated.status, updated.id);

    let page = client.find_all(&FindAllOrders::default()).await?;
    println!(
        "Listed {} of {} orders (last page {})",
        page.data.len(),
        page.meta.total_orders,
        page.meta.last_page
    );

    // Unknown products are rejected before anything is stored.
    match client
        .create_order(vec![LineItem {
            product_id: "missing".into(),
            quantity: 1,
        }])
        .await
    {
        Ok(order) => println!("unexpectedly created {}", order.id),
        Err(err) => match err.downcast_ref::<ApiError>() {
            Some(api) => println!("Rejected with {}: {}", api.status, api.message),
            None => return Err(err),
        },
    }

    handle.abort();
    Ok(())
}
