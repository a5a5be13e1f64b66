//! Common value types used across the platform

use chrono::{DateTime, Utc};

/// Prefix for sales order numbers
pub const SALES_ORDER_PREFIX: &str = "SO";

/// Prefix for purchase order numbers
pub const PURCHASE_ORDER_PREFIX: &str = "PO";

/// Render an order number: `{prefix}-{UTC timestamp}-{4 digit suffix}`.
///
/// Uniqueness is checked by the caller against storage, not guaranteed by
/// construction; on a collision the caller regenerates with a new suffix.
pub fn format_order_number(prefix: &str, at: DateTime<Utc>, suffix: u16) -> String {
    format!("{}-{}-{:04}", prefix, at.format("%Y%m%d%H%M%S"), suffix)
}

/// Clamp a caller-supplied page limit into `1..=max`.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}
