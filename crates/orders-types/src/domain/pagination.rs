use serde::{Deserialize, Serialize};

use super::order::{OrderSummary, ValidationError};
use super::status::OrderStatus;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// A 1-indexed, offset-based page over the status-filtered orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub status: Option<OrderStatus>,
}

impl PageRequest {
    pub fn new(
        page: Option<u32>,
        limit: Option<u32>,
        status: Option<OrderStatus>,
    ) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if limit == 0 {
            return Err(ValidationError::InvalidLimit);
        }
        Ok(Self {
            page,
            limit,
            status,
        })
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            status: None,
        }
    }
}

pub fn last_page(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub status: Option<OrderStatus>,
    pub total_orders: u64,
    pub last_page: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPage {
    pub meta: PageMeta,
    pub data: Vec<OrderSummary>,
}
