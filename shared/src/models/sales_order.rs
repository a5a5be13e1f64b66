//! Sales order models and state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sales order lifecycle
///
/// RESERVED is the only non-terminal state: stock is held for the order
/// until it is either confirmed (reserved stock consumed for good) or
/// cancelled (reserved stock released back to available).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SalesOrderStatus {
    Reserved,
    Confirmed,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalesOrderStatus::Reserved => "RESERVED",
            SalesOrderStatus::Confirmed => "CONFIRMED",
            SalesOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESERVED" => Some(SalesOrderStatus::Reserved),
            "CONFIRMED" => Some(SalesOrderStatus::Confirmed),
            "CANCELLED" => Some(SalesOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SalesOrderStatus::Reserved)
    }
}

/// One line of a sales order, with the product identity and the unit price
/// snapshotted at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderLine {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Full sales order aggregate returned by every engine operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrderDetail {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub status: SalesOrderStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<SalesOrderLine>,
}
