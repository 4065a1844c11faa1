use anyhow::Context;
use orders_types::domain::status::TransitionPolicy;
use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER_PORT: &str = "3000";
pub const DEFAULT_PRODUCTS_URL: &str = "http://127.0.0.1:3001/";
pub const DEFAULT_PRODUCTS_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub products_url: String,
    pub products_timeout_ms: u64,
    pub status_policy: TransitionPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset keys take their defaults;
    /// set but malformed values are an error.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_port = lookup("SERVER_PORT").unwrap_or_else(|| DEFAULT_SERVER_PORT.into());
        let database_url = lookup("DATABASE_URL");
        let products_url =
            lookup("PRODUCTS_SERVICE_URL").unwrap_or_else(|| DEFAULT_PRODUCTS_URL.into());
        let products_timeout_ms = match lookup("PRODUCTS_TIMEOUT_MS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("invalid PRODUCTS_TIMEOUT_MS '{v}'"))?,
            None => DEFAULT_PRODUCTS_TIMEOUT_MS,
        };
        let status_policy = match lookup("ORDER_STATUS_POLICY") {
            Some(v) => v
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid ORDER_STATUS_POLICY")?,
            None => TransitionPolicy::default(),
        };
        Ok(Self {
            server_port,
            database_url,
            products_url,
            products_timeout_ms,
            status_policy,
        })
    }

    pub fn products_timeout(&self) -> Duration {
        Duration::from_millis(self.products_timeout_ms)
    }
}
