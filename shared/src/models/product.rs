//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable product
///
/// SKUs are unique case-insensitively. Quantities live in the stock level,
/// not here; `reorder_point` / `reorder_quantity` only parameterize the
/// replenishment advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product together with its current stock level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
}
