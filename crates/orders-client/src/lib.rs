use std::time::Duration;

use anyhow::Context;
use orders_types::domain::order::{LineItem, OrderView};
use orders_types::domain::pagination::OrderPage;
use orders_types::domain::status::OrderStatus;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrdersClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct OrdersClient {
    base: Url,
    client: reqwest::Client,
}

/// A structured failure reported by the orders service.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Deserialize)]
#[error("orders service returned {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl OrdersClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<OrdersClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(OrdersClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn create_order(&self, items: Vec<LineItem>) -> anyhow::Result<OrderView> {
        let res = self
            .client
            .post(self.url("orders")?)
            .json(&CreateOrderRequest { items })
            .send()
            .await?;
        decode(res).await
    }

    pub async fn find_all(&self, query: &FindAllOrders) -> anyhow::Result<OrderPage> {
        let res = self
            .client
            .get(self.url("orders")?)
            .query(query)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn find_one(&self, id: Uuid) -> anyhow::Result<OrderView> {
        let res = self
            .client
            .get(self.url(&format!("orders/{id}"))?)
            .send()
            .await?;
        decode(res).await
    }

    pub async fn change_status(&self, id: Uuid, status: OrderStatus) -> anyhow::Result<OrderView> {
        let res = self
            .client
            .patch(self.url(&format!("orders/{id}/status"))?)
            .json(&ChangeStatusRequest { status })
            .send()
            .await?;
        decode(res).await
    }
}

/// Turns error bodies into [`ApiError`] so callers can downcast on status.
async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> anyhow::Result<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }
    let err = match res.json::<ApiError>().await {
        Ok(api) => api,
        Err(_) => ApiError {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        },
    };
    tracing::debug!(status = err.status, message = %err.message, "orders request failed");
    Err(err.into())
}

impl OrdersClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<OrdersClient> {
        if let Some(client) = self.client {
            return Ok(OrdersClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(OrdersClient {
            base: self.base,
            client,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CreateOrderRequest {
    items: Vec<LineItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChangeStatusRequest {
    status: OrderStatus,
}

/// Query for one page of orders. Unset fields use the server defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FindAllOrders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use orders_types::domain::order::OrderItemView;
    use orders_types::domain::pagination::PageMeta;

    fn sample_order() -> OrderView {
        OrderView {
            id: Uuid::new_v4(),
            total_amount: 21,
            total_items: 3,
            status: OrderStatus::Pending,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            order_item: vec![OrderItemView {
                name: "Widget".into(),
                product_id: "p1".into(),
                price: 7,
                quantity: 3,
            }],
        }
    }

    fn items() -> Vec<LineItem> {
        vec![LineItem {
            product_id: "p1".into(),
            quantity: 3,
        }]
    }

    #[tokio::test]
    async fn create_and_find_one() {
        let server = MockServer::start();
        let order = sample_order();

        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/orders")
                .json_body(serde_json::json!({ "items": [{ "productId": "p1", "quantity": 3 }] }));
            then.status(201).json_body_obj(&order);
        });

        let get_mock = server.mock(|when, then| {
            when.method(GET).path(format!("/orders/{}", order.id));
            then.status(200).json_body_obj(&order);
        });

        let client = OrdersClient::new(&server.base_url()).unwrap();
        let created = client.create_order(items()).await.unwrap();
        assert_eq!(created.id, order.id);
        assert_eq!(created.order_item[0].name, "Widget");

        let fetched = client.find_one(order.id).await.unwrap();
        assert_eq!(fetched.total_amount, 21);

        create_mock.assert();
        get_mock.assert();
    }

    #[tokio::test]
    async fn find_all_and_change_status() {
        let server = MockServer::start();
        let order = sample_order();

        let list_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/orders")
                .query_param("page", "2")
                .query_param("status", "PENDING");
            then.status(200).json_body_obj(&OrderPage {
                meta: PageMeta {
                    page: 2,
                    status: Some(OrderStatus::Pending),
                    total_orders: 11,
                    last_page: 2,
                },
                data: vec![],
            });
        });

        let update_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path(format!("/orders/{}/status", order.id))
                .json_body(serde_json::json!({ "status": "CONFIRMED" }));
            let mut updated = order.clone();
            updated.status = OrderStatus::Confirmed;
            then.status(200).json_body_obj(&updated);
        });

        let client = OrdersClient::new(&server.base_url()).unwrap();
        let page = client
            .find_all(&FindAllOrders {
                page: Some(2),
                limit: None,
                status: Some(OrderStatus::Pending),
            })
            .await
            .unwrap();
        assert_eq!(page.meta.total_orders, 11);
        assert!(page.data.is_empty());

        let updated = client
            .change_status(order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Confirmed);

        list_mock.assert();
        update_mock.assert();
    }

    #[tokio::test]
    async fn error_bodies_become_api_errors() {
        let server = MockServer::start();
        let id = Uuid::new_v4();
        server.mock(|when, then| {
            when.method(GET).path(format!("/orders/{id}"));
            then.status(404).json_body(serde_json::json!({
                "status": 404,
                "message": format!("order with id {id} not found")
            }));
        });

        let client = OrdersClient::new(&server.base_url()).unwrap();
        let err = client.find_one(id).await.unwrap_err();
        let api = err.downcast_ref::<ApiError>().expect("api error");
        assert_eq!(api.status, 404);
        assert!(api.message.contains(&id.to_string()));
    }
}
