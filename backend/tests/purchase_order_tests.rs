//! Purchase order engine tests
//!
//! Tests for receipt planning and the derived order status:
//! - RECEIVED if and only if every line is fully received
//! - Receiving with no explicit items takes the full remaining quantity of
//!   every line in one receipt
//! - Explicit quantities are capped by each line's remaining quantity
//! - Received quantities only ever grow

use proptest::prelude::*;
use shared::models::{
    derive_status, plan_receipt, PurchaseLineState, PurchaseOrderStatus, ReceiptPlanError,
    ReceiptRequestLine, StockLevel,
};
use uuid::Uuid;

fn line(ordered: i32, received: i32) -> PurchaseLineState {
    PurchaseLineState {
        product_id: Uuid::new_v4(),
        ordered_quantity: ordered,
        received_quantity: received,
    }
}

/// Apply planned allocations to the order lines and the stock pool, the
/// way one receive call does inside its transaction.
fn apply_receipt(
    lines: &mut [PurchaseLineState],
    stock: &mut StockLevel,
    allocations: &[shared::models::ReceiptAllocation],
) {
    for allocation in allocations {
        stock.receive(allocation.quantity).unwrap();
        let target = lines
            .iter_mut()
            .find(|l| l.product_id == allocation.product_id)
            .expect("allocation references an order line");
        target.received_quantity += allocation.quantity;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(PurchaseOrderStatus::Ordered.accepts_receipts());
        assert!(PurchaseOrderStatus::PartiallyReceived.accepts_receipts());
        assert!(!PurchaseOrderStatus::Received.accepts_receipts());
        assert!(!PurchaseOrderStatus::Cancelled.accepts_receipts());
    }

    #[test]
    fn test_receive_everything_in_one_call() {
        let mut lines = vec![line(5, 0), line(3, 0)];
        let mut stock = StockLevel::new(0, 0);

        let allocations = plan_receipt(&lines, None).unwrap();
        assert_eq!(allocations.len(), 2);
        apply_receipt(&mut lines, &mut stock, &allocations);

        // One call can close the order straight from ORDERED.
        assert_eq!(derive_status(&lines), PurchaseOrderStatus::Received);
        assert_eq!(stock.available, 8);
    }

    #[test]
    fn test_empty_items_list_means_receive_all_remaining() {
        let lines = vec![line(5, 2), line(3, 1)];
        let explicit_none = plan_receipt(&lines, None).unwrap();
        let explicit_empty = plan_receipt(&lines, Some(&[])).unwrap();
        assert_eq!(explicit_none, explicit_empty);
        assert_eq!(explicit_none[0].quantity, 3);
        assert_eq!(explicit_none[1].quantity, 2);
    }

    #[test]
    fn test_partial_then_final_receipt() {
        let mut lines = vec![line(10, 0), line(4, 0)];
        let mut stock = StockLevel::new(0, 0);

        let first = [ReceiptRequestLine {
            product_id: lines[0].product_id,
            quantity: 6,
        }];
        let allocations = plan_receipt(&lines, Some(&first)).unwrap();
        apply_receipt(&mut lines, &mut stock, &allocations);
        assert_eq!(derive_status(&lines), PurchaseOrderStatus::PartiallyReceived);

        // Second call with no items closes out both lines.
        let allocations = plan_receipt(&lines, None).unwrap();
        apply_receipt(&mut lines, &mut stock, &allocations);
        assert_eq!(derive_status(&lines), PurchaseOrderStatus::Received);
        assert_eq!(stock.available, 14);
    }

    #[test]
    fn test_over_receipt_is_rejected() {
        let lines = vec![line(5, 4)];
        let request = [ReceiptRequestLine {
            product_id: lines[0].product_id,
            quantity: 2,
        }];
        assert!(matches!(
            plan_receipt(&lines, Some(&request)),
            Err(ReceiptPlanError::ExceedsRemaining {
                remaining: 1,
                requested: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_product_is_rejected() {
        let lines = vec![line(5, 0)];
        let request = [ReceiptRequestLine {
            product_id: Uuid::new_v4(),
            quantity: 1,
        }];
        assert!(matches!(
            plan_receipt(&lines, Some(&request)),
            Err(ReceiptPlanError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_cancellation_does_not_reverse_stock() {
        // Goods already received stay in stock when the remainder of the
        // order is cancelled.
        let mut lines = vec![line(10, 0)];
        let mut stock = StockLevel::new(0, 0);
        let request = [ReceiptRequestLine {
            product_id: lines[0].product_id,
            quantity: 4,
        }];
        let allocations = plan_receipt(&lines, Some(&request)).unwrap();
        apply_receipt(&mut lines, &mut stock, &allocations);

        // Cancel: only the status changes.
        assert_eq!(stock.available, 4);
        assert_eq!(lines[0].received_quantity, 4);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn lines_strategy() -> impl Strategy<Value = Vec<PurchaseLineState>> {
        prop::collection::vec(
            (1..40i32).prop_flat_map(|ordered| {
                (0..=ordered).prop_map(move |received| line(ordered, received))
            }),
            1..6,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The order is RECEIVED exactly when every line's received
        /// quantity equals its ordered quantity.
        #[test]
        fn prop_received_iff_all_lines_complete(lines in lines_strategy()) {
            let complete = lines.iter().all(|l| l.received_quantity == l.ordered_quantity);
            let status = derive_status(&lines);
            prop_assert_eq!(status == PurchaseOrderStatus::Received, complete);
        }

        /// Receiving with no explicit items always closes the order, in a
        /// single receipt covering exactly the remaining total.
        #[test]
        fn prop_receive_all_closes_the_order(mut lines in lines_strategy()) {
            let remaining_total: i32 = lines
                .iter()
                .map(|l| l.ordered_quantity - l.received_quantity)
                .sum();
            prop_assume!(remaining_total > 0);

            let mut stock = StockLevel::new(0, 0);
            let allocations = plan_receipt(&lines, None).unwrap();
            let allocated_total: i32 = allocations.iter().map(|a| a.quantity).sum();
            prop_assert_eq!(allocated_total, remaining_total);

            apply_receipt(&mut lines, &mut stock, &allocations);
            prop_assert_eq!(derive_status(&lines), PurchaseOrderStatus::Received);
            prop_assert_eq!(stock.available, remaining_total);
        }

        /// Applying any planned receipt keeps received quantities
        /// monotonically non-decreasing and never past the ordered amount.
        #[test]
        fn prop_received_quantities_grow_within_bounds(
            mut lines in lines_strategy(),
            picks in prop::collection::vec((0usize..6, 1..40i32), 1..4)
        ) {
            let before = lines.clone();
            let request: Vec<ReceiptRequestLine> = picks
                .iter()
                .enumerate()
                .filter_map(|(i, (idx, quantity))| {
                    // Build a well-formed request: distinct known lines only.
                    let line = lines.get(*idx)?;
                    if picks[..i].iter().any(|(other, _)| other == idx) {
                        return None;
                    }
                    let remaining = line.ordered_quantity - line.received_quantity;
                    if remaining == 0 {
                        return None;
                    }
                    Some(ReceiptRequestLine {
                        product_id: line.product_id,
                        quantity: (*quantity).min(remaining),
                    })
                })
                .collect();
            prop_assume!(!request.is_empty());

            let mut stock = StockLevel::new(0, 0);
            let allocations = plan_receipt(&lines, Some(&request)).unwrap();
            apply_receipt(&mut lines, &mut stock, &allocations);

            for (after, before) in lines.iter().zip(before.iter()) {
                prop_assert!(after.received_quantity >= before.received_quantity);
                prop_assert!(after.received_quantity <= after.ordered_quantity);
            }
        }

        /// Planning never over-allocates a line, regardless of the request.
        #[test]
        fn prop_allocations_fit_remaining(
            lines in lines_strategy(),
            quantities in prop::collection::vec(1..80i32, 1..6)
        ) {
            let request: Vec<ReceiptRequestLine> = lines
                .iter()
                .zip(quantities.iter())
                .map(|(line, quantity)| ReceiptRequestLine {
                    product_id: line.product_id,
                    quantity: *quantity,
                })
                .collect();

            if let Ok(allocations) = plan_receipt(&lines, Some(&request)) {
                for allocation in allocations {
                    let line = lines
                        .iter()
                        .find(|l| l.product_id == allocation.product_id)
                        .unwrap();
                    prop_assert!(
                        allocation.quantity <= line.ordered_quantity - line.received_quantity
                    );
                }
            }
        }
    }
}
