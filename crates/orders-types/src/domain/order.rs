use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::product::ProductDetail;
use super::status::OrderStatus;

/// One requested `(productId, quantity)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("items empty")]
    EmptyItems,
    #[error("product id must not be blank")]
    BlankProductId,
    #[error("item {0} quantity must be > 0")]
    ZeroQuantity(String),
    #[error("page must be >= 1")]
    InvalidPage,
    #[error("limit must be >= 1")]
    InvalidLimit,
}

pub fn validate_line_items(items: &[LineItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyItems);
    }
    for it in items {
        if it.product_id.trim().is_empty() {
            return Err(ValidationError::BlankProductId);
        }
        if it.quantity == 0 {
            return Err(ValidationError::ZeroQuantity(it.product_id.clone()));
        }
    }
    Ok(())
}

/// Distinct ids in first-seen order.
pub fn distinct_product_ids<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("product {0} missing from catalog response")]
pub struct MissingProduct(pub String);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error(transparent)]
    Missing(#[from] MissingProduct),
    #[error("catalog reported negative price {price} for product {product_id}")]
    NegativePrice { product_id: String, price: i64 },
    #[error("order total overflows")]
    Overflow,
}

/// An item priced at creation time, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub price: i64,
}

/// A fully priced order ready to be written in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub total_amount: i64,
    pub total_items: i64,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Prices every line item independently against the catalog answer.
    ///
    /// Duplicate product ids stay separate lines; nothing is merged.
    pub fn price(
        items: &[LineItem],
        catalog: &HashMap<String, ProductDetail>,
    ) -> Result<Self, PricingError> {
        let mut total_amount: i64 = 0;
        let mut total_items: i64 = 0;
        let mut priced = Vec::with_capacity(items.len());

        for it in items {
            let product = catalog
                .get(&it.product_id)
                .ok_or_else(|| MissingProduct(it.product_id.clone()))?;
            if product.price < 0 {
                return Err(PricingError::NegativePrice {
                    product_id: it.product_id.clone(),
                    price: product.price,
                });
            }
            let line = product
                .price
                .checked_mul(i64::from(it.quantity))
                .ok_or(PricingError::Overflow)?;
            total_amount = total_amount
                .checked_add(line)
                .ok_or(PricingError::Overflow)?;
            total_items = total_items
                .checked_add(i64::from(it.quantity))
                .ok_or(PricingError::Overflow)?;
            priced.push(NewOrderItem {
                product_id: it.product_id.clone(),
                quantity: it.quantity,
                price: product.price,
            });
        }

        Ok(Self {
            total_amount,
            total_items,
            status: OrderStatus::default(),
            items: priced,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: u32,
    /// Price frozen at creation, in minor units.
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub total_amount: i64,
    pub total_items: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Assigns identities and timestamps to a priced order.
    pub fn from_new(new: NewOrder) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let items = new
            .items
            .into_iter()
            .map(|it| OrderItem {
                id: Uuid::new_v4(),
                order_id: id,
                product_id: it.product_id,
                quantity: it.quantity,
                price: it.price,
            })
            .collect();
        Self {
            id,
            total_amount: new.total_amount,
            total_items: new.total_items,
            status: new.status,
            created_at: now,
            updated_at: now,
            items,
        }
    }

    pub fn update_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn product_ids(&self) -> Vec<String> {
        distinct_product_ids(self.items.iter().map(|it| it.product_id.as_str()))
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            total_amount: self.total_amount,
            total_items: self.total_items,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Attaches current product names. Prices stay as persisted.
    pub fn enrich(
        self,
        catalog: &HashMap<String, ProductDetail>,
    ) -> Result<OrderView, MissingProduct> {
        let order_item = self
            .items
            .into_iter()
            .map(|it| {
                let product = catalog
                    .get(&it.product_id)
                    .ok_or_else(|| MissingProduct(it.product_id.clone()))?;
                Ok(OrderItemView {
                    name: product.name.clone(),
                    product_id: it.product_id,
                    price: it.price,
                    quantity: it.quantity,
                })
            })
            .collect::<Result<Vec<_>, MissingProduct>>()?;

        Ok(OrderView {
            id: self.id,
            total_amount: self.total_amount,
            total_items: self.total_items,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            order_item,
        })
    }
}

/// Order header as returned by list views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub total_amount: i64,
    pub total_items: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub name: String,
    pub product_id: String,
    pub price: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub total_amount: i64,
    pub total_items: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_item: Vec<OrderItemView>,
}
