use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use orders_types::domain::order::distinct_product_ids;
use orders_types::domain::product::{index_by_id, ProductDetail};
use orders_types::ports::product_validator::{ProductValidator, ValidatorError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct HttpProductValidatorBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

/// Catalog client speaking `POST /products/validate`.
///
/// Every call is bounded by the configured timeout; an expired wait is
/// reported as `Unavailable`, never as a missing product.
#[derive(Clone)]
pub struct HttpProductValidator {
    base: Url,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    ids: &'a [String],
}

#[derive(Deserialize, Default)]
struct Rejection {
    #[serde(default)]
    missing: Vec<String>,
}

impl HttpProductValidator {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<HttpProductValidatorBuilder> {
        let mut base = Url::parse(base_url).context("invalid products base url")?;
        // `join` replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(HttpProductValidatorBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ValidatorError> {
        self.base
            .join(path)
            .map_err(|e| ValidatorError::Unavailable(format!("failed to join url: {e}")))
    }
}

fn unavailable(e: reqwest::Error) -> ValidatorError {
    if e.is_timeout() {
        ValidatorError::Unavailable(format!("timed out waiting for product service: {e}"))
    } else {
        ValidatorError::Unavailable(e.to_string())
    }
}

/// Keeps one detail per requested id; any requested id left over is missing.
fn reconcile(
    requested: &[String],
    products: Vec<ProductDetail>,
) -> Result<Vec<ProductDetail>, ValidatorError> {
    let found = index_by_id(products);
    let missing: Vec<String> = requested
        .iter()
        .filter(|id| !found.contains_key(*id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ValidatorError::ProductNotFound(missing));
    }
    Ok(requested
        .iter()
        .filter_map(|id| found.get(id).cloned())
        .collect())
}

#[async_trait]
impl ProductValidator for HttpProductValidator {
    #[instrument(name = "products::validate", skip(self, ids), fields(requested = ids.len()), err)]
    async fn validate_products(
        &self,
        ids: &[String],
    ) -> Result<Vec<ProductDetail>, ValidatorError> {
        let distinct = distinct_product_ids(ids.iter().map(String::as_str));
        if distinct.is_empty() {
            return Err(ValidatorError::EmptyRequest);
        }

        let res = self
            .client
            .post(self.url("products/validate")?)
            .json(&ValidateRequest { ids: &distinct })
            .send()
            .await
            .map_err(unavailable)?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            let rejection: Rejection = res.json().await.unwrap_or_default();
            let missing = if rejection.missing.is_empty() {
                distinct
            } else {
                rejection.missing
            };
            tracing::warn!(?missing, "product service rejected ids");
            return Err(ValidatorError::ProductNotFound(missing));
        }
        if !status.is_success() {
            return Err(ValidatorError::Unavailable(format!(
                "product service responded {status}"
            )));
        }

        let products: Vec<ProductDetail> = res.json().await.map_err(unavailable)?;
        reconcile(&distinct, products)
    }
}

impl HttpProductValidatorBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
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

    /// Uses a caller-supplied client as is; its own timeout applies.
    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<HttpProductValidator> {
        if let Some(client) = self.client {
            return Ok(HttpProductValidator {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        let client = builder.build()?;
        Ok(HttpProductValidator {
            base: self.base,
            client,
        })
    }
}
