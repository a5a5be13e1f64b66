//! Purchase order models, state machine and receipt planning

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Purchase order lifecycle
///
/// ORDERED and PARTIALLY_RECEIVED both accept further receipts or a
/// cancellation; RECEIVED and CANCELLED are terminal. The stored status is
/// a cache: line quantities are the source of truth and the status is
/// recomputed from them after every receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Ordered,
    PartiallyReceived,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Ordered => "ORDERED",
            PurchaseOrderStatus::PartiallyReceived => "PARTIALLY_RECEIVED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ORDERED" => Some(PurchaseOrderStatus::Ordered),
            "PARTIALLY_RECEIVED" => Some(PurchaseOrderStatus::PartiallyReceived),
            "RECEIVED" => Some(PurchaseOrderStatus::Received),
            "CANCELLED" => Some(PurchaseOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }

    /// Goods can only arrive against an order that is still open.
    pub fn accepts_receipts(&self) -> bool {
        !self.is_terminal()
    }
}

/// Ordered/received quantities of one purchase order line, as needed by the
/// status derivation and receipt planning rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLineState {
    pub product_id: Uuid,
    pub ordered_quantity: i32,
    pub received_quantity: i32,
}

impl PurchaseLineState {
    pub fn remaining_quantity(&self) -> i32 {
        self.ordered_quantity - self.received_quantity
    }
}

/// Derive the order status from its line quantities.
///
/// Recomputed from scratch on every receipt: a single call can take an
/// order from ORDERED straight to RECEIVED, so the previous status must not
/// be assumed.
pub fn derive_status(lines: &[PurchaseLineState]) -> PurchaseOrderStatus {
    let total_remaining: i32 = lines.iter().map(|l| l.remaining_quantity()).sum();
    if total_remaining == 0 {
        return PurchaseOrderStatus::Received;
    }
    let total_received: i32 = lines.iter().map(|l| l.received_quantity).sum();
    if total_received == 0 {
        PurchaseOrderStatus::Ordered
    } else {
        PurchaseOrderStatus::PartiallyReceived
    }
}

/// Explicitly requested quantity for one line of a receive call
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ReceiptRequestLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Quantity to apply to one line, as planned for a single receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptAllocation {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Why a receive request cannot be honored
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReceiptPlanError {
    #[error("product {0} is not a line of this purchase order")]
    UnknownProduct(Uuid),

    #[error("product {0} appears more than once in the receive request")]
    DuplicateProduct(Uuid),

    #[error("received quantity must be positive for product {0}")]
    NonPositiveQuantity(Uuid),

    #[error(
        "received quantity exceeds remaining for product {product_id}: remaining={remaining}, requested={requested}"
    )]
    ExceedsRemaining {
        product_id: Uuid,
        remaining: i32,
        requested: i32,
    },

    #[error("purchase order has no remaining quantity to receive")]
    NothingToReceive,
}

/// Plan the per-line quantities of one receipt.
///
/// An absent or empty request list means "receive the full remaining
/// quantity of every open line". Explicit items must each reference a
/// distinct line of the order and must not exceed that line's remaining
/// quantity. Allocations are returned in the caller-supplied order.
pub fn plan_receipt(
    lines: &[PurchaseLineState],
    requested: Option<&[ReceiptRequestLine]>,
) -> Result<Vec<ReceiptAllocation>, ReceiptPlanError> {
    match requested {
        None | Some([]) => {
            let allocations: Vec<ReceiptAllocation> = lines
                .iter()
                .filter(|line| line.remaining_quantity() > 0)
                .map(|line| ReceiptAllocation {
                    product_id: line.product_id,
                    quantity: line.remaining_quantity(),
                })
                .collect();
            if allocations.is_empty() {
                return Err(ReceiptPlanError::NothingToReceive);
            }
            Ok(allocations)
        }
        Some(items) => {
            let mut allocations = Vec::with_capacity(items.len());
            for item in items {
                if item.quantity <= 0 {
                    return Err(ReceiptPlanError::NonPositiveQuantity(item.product_id));
                }
                if allocations
                    .iter()
                    .any(|a: &ReceiptAllocation| a.product_id == item.product_id)
                {
                    return Err(ReceiptPlanError::DuplicateProduct(item.product_id));
                }
                let line = lines
                    .iter()
                    .find(|l| l.product_id == item.product_id)
                    .ok_or(ReceiptPlanError::UnknownProduct(item.product_id))?;
                let remaining = line.remaining_quantity();
                if item.quantity > remaining {
                    return Err(ReceiptPlanError::ExceedsRemaining {
                        product_id: item.product_id,
                        remaining,
                        requested: item.quantity,
                    });
                }
                allocations.push(ReceiptAllocation {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            Ok(allocations)
        }
    }
}

/// One line of a purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub ordered_quantity: i32,
    pub received_quantity: i32,
    pub unit_cost: Decimal,
}

/// One line of a recorded receipt event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
}

/// One inbound-goods event against a purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptDetail {
    pub id: Uuid,
    pub received_by: String,
    pub received_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
}

/// Full purchase order aggregate returned by every engine operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderDetail {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: String,
    pub note: Option<String>,
    pub status: PurchaseOrderStatus,
    pub created_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
    pub lines: Vec<PurchaseOrderLine>,
    pub receipts: Vec<ReceiptDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordered: i32, received: i32) -> PurchaseLineState {
        PurchaseLineState {
            product_id: Uuid::new_v4(),
            ordered_quantity: ordered,
            received_quantity: received,
        }
    }

    #[test]
    fn status_is_received_iff_every_line_complete() {
        assert_eq!(
            derive_status(&[line(5, 5), line(3, 3)]),
            PurchaseOrderStatus::Received
        );
        assert_eq!(
            derive_status(&[line(5, 5), line(3, 2)]),
            PurchaseOrderStatus::PartiallyReceived
        );
        assert_eq!(
            derive_status(&[line(5, 0), line(3, 0)]),
            PurchaseOrderStatus::Ordered
        );
    }

    #[test]
    fn empty_request_receives_all_remaining() {
        let lines = [line(5, 2), line(3, 3), line(4, 0)];
        let allocations = plan_receipt(&lines, Some(&[])).unwrap();
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].quantity, 3);
        assert_eq!(allocations[1].quantity, 4);
    }

    #[test]
    fn explicit_request_cannot_exceed_remaining() {
        let lines = [line(5, 2)];
        let request = [ReceiptRequestLine {
            product_id: lines[0].product_id,
            quantity: 4,
        }];
        assert!(matches!(
            plan_receipt(&lines, Some(&request)),
            Err(ReceiptPlanError::ExceedsRemaining { remaining: 3, .. })
        ));
    }

    #[test]
    fn fully_received_order_has_nothing_left() {
        let lines = [line(5, 5)];
        assert_eq!(
            plan_receipt(&lines, None),
            Err(ReceiptPlanError::NothingToReceive)
        );
    }

    #[test]
    fn duplicate_request_lines_are_rejected() {
        let lines = [line(5, 0)];
        let request = [
            ReceiptRequestLine {
                product_id: lines[0].product_id,
                quantity: 1,
            },
            ReceiptRequestLine {
                product_id: lines[0].product_id,
                quantity: 1,
            },
        ];
        assert_eq!(
            plan_receipt(&lines, Some(&request)),
            Err(ReceiptPlanError::DuplicateProduct(lines[0].product_id))
        );
    }
}
