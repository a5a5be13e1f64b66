//! Supplier and supplier contract models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A goods supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchasing terms linking one product to one supplier
///
/// At most one contract per product carries `is_primary`; the backend
/// demotes any other primary contract when a new one is flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierContract {
    pub id: Uuid,
    pub product_id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_code: String,
    pub supplier_name: String,
    pub unit_cost: Decimal,
    pub lead_time_days: i32,
    pub moq: i32,
    pub lot_size: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pick the contract replenishment should buy against: the primary one if
/// present, otherwise the cheapest.
pub fn select_preferred_contract(contracts: &[SupplierContract]) -> Option<&SupplierContract> {
    contracts.iter().min_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then(a.unit_cost.cmp(&b.unit_cost))
    })
}

/// Minimum order quantity floor: absent or sub-1 values mean 1.
pub fn normalize_moq(value: Option<i32>) -> i32 {
    value.unwrap_or(1).max(1)
}

/// Lot size floor: absent or sub-1 values mean "no lot rounding".
pub fn normalize_lot_size(value: Option<i32>) -> i32 {
    value.unwrap_or(1).max(1)
}

/// Lead times cannot be negative.
pub fn normalize_lead_time(value: Option<i32>) -> i32 {
    value.unwrap_or(0).max(0)
}
