use orders_hex::application::order_service::OrderService;
use orders_hex::config::Config;
use orders_hex::inbound::http::{HttpServer, HttpServerConfig};
use orders_hex::outbound::products::HttpProductValidator;
use orders_repo::build_repo;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT / PRODUCTS_SERVICE_URL when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Config::from_env()?;

    // The store is ready before the server accepts any request.
    let repo = Arc::new(build_repo(config.database_url.as_deref()).await?);
    let products = HttpProductValidator::builder(&config.products_url)?
        .with_timeout(config.products_timeout())
        .build()?;
    let service = OrderService::new(repo.clone(), products)
        .with_policy(config.status_policy);
    tracing::info!(
        products_url = %config.products_url,
        policy = ?service.policy(),
        "order service configured"
    );

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(service, server_cfg).await?;
    http.run_until(shutdown_signal()).await?;

    repo.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
