use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    routing::{get, patch, post},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::errors::AppError;
use orders_types::domain::order::{LineItem, OrderView};
use orders_types::domain::pagination::{OrderPage, PageRequest};
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::OrderRepository;
use orders_types::ports::product_validator::ProductValidator;

type SharedService<R, P> = Arc<OrderService<R, P>>;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

#[derive(Clone)]
pub struct HttpServer<R, P>
where
    R: OrderRepository,
    P: ProductValidator,
{
    pub service: SharedService<R, P>,
    pub config: HttpServerConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|e| AppError::Validation(format!("invalid order id: {e}")))
}

impl<R, P> HttpServer<R, P>
where
    R: OrderRepository,
    P: ProductValidator,
{
    pub async fn new(service: OrderService<R, P>, config: HttpServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        Router::new()
            .route("/health", get(health))
            .route("/orders", post(create_order::<R, P>).get(list_orders::<R, P>))
            .route("/orders/{id}", get(get_order::<R, P>))
            .route("/orders/{id}/status", patch(change_status::<R, P>))
            .layer(trace_layer)
            .with_state(self.service.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("server drained");
        Ok(())
    }
}

async fn health() -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn create_order<R, P>(
    State(service): State<SharedService<R, P>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<OrderView>), AppError>
where
    R: OrderRepository,
    P: ProductValidator,
{
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let order = service.create_order(payload.items).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order)))
}

async fn get_order<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, AppError>
where
    R: OrderRepository,
    P: ProductValidator,
{
    let order = service.find_one(parse_id(&id)?).await?;
    Ok(Json(order))
}

async fn list_orders<R, P>(
    State(service): State<SharedService<R, P>>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<OrderPage>, AppError>
where
    R: OrderRepository,
    P: ProductValidator,
{
    let Query(q) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let page = PageRequest::new(q.page, q.limit, q.status)?;
    let list = service.find_all(page).await?;
    Ok(Json(list))
}

async fn change_status<R, P>(
    State(service): State<SharedService<R, P>>,
    Path(id): Path<String>,
    payload: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<OrderView>, AppError>
where
    R: OrderRepository,
    P: ProductValidator,
{
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let updated = service.change_status(id, payload.status).await?;
    Ok(Json(updated))
}
