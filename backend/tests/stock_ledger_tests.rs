//! Stock ledger tests
//!
//! Tests for the available/reserved pair including:
//! - Quantity conservation across reserve/release/confirm/receive cycles
//! - Non-negativity of both fields after every operation
//! - Failed operations leaving the level untouched
//! - Error taxonomy mapping at the engine boundary

use proptest::prelude::*;
use shared::models::{StockError, StockLevel};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use inventory_backend::error::AppError;

    #[test]
    fn test_reserve_then_confirm_consumes_stock() {
        let mut level = StockLevel::new(10, 0);
        level.reserve(4).unwrap();
        assert_eq!(level, StockLevel::new(6, 4));

        level.consume_reserved(4).unwrap();
        assert_eq!(level, StockLevel::new(6, 0));
    }

    #[test]
    fn test_reserve_then_cancel_restores_availability() {
        let mut level = StockLevel::new(10, 0);
        level.reserve(7).unwrap();
        level.release(7).unwrap();

        // Back to the pre-reservation value, nothing reserved.
        assert_eq!(level, StockLevel::new(10, 0));
    }

    #[test]
    fn test_receive_bypasses_reservation() {
        let mut level = StockLevel::new(2, 5);
        level.receive(8).unwrap();
        assert_eq!(level, StockLevel::new(10, 5));
    }

    #[test]
    fn test_insufficient_reservation_has_no_effect() {
        let mut level = StockLevel::new(3, 1);
        let err = level.reserve(5).unwrap_err();
        assert!(matches!(err, StockError::Insufficient { available: 3, requested: 5 }));
        assert_eq!(level, StockLevel::new(3, 1));
    }

    #[test]
    fn test_adjustment_bounds() {
        let mut level = StockLevel::new(4, 0);
        level.adjust(3).unwrap();
        level.adjust(-7).unwrap();
        assert_eq!(level.available, 0);
        assert!(level.adjust(-1).is_err());
    }

    #[test]
    fn test_insufficient_stock_is_a_client_error() {
        let err: AppError = StockError::Insufficient {
            available: 0,
            requested: 1,
        }
        .into();
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_reserved_inconsistency_is_a_server_fault() {
        let err: AppError = StockError::ReservedInconsistent {
            reserved: 2,
            requested: 3,
        }
        .into();
        assert_eq!(err.code(), "INCONSISTENT_STATE");
        assert!(!err.is_client_error());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// One ledger operation against a single product row
    #[derive(Debug, Clone, Copy)]
    enum Op {
        Reserve(i32),
        Release(i32),
        ConfirmReserved(i32),
        Receive(i32),
        Adjust(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1..50i32).prop_map(Op::Reserve),
            (1..50i32).prop_map(Op::Release),
            (1..50i32).prop_map(Op::ConfirmReserved),
            (1..50i32).prop_map(Op::Receive),
            (-50..50i32).prop_map(Op::Adjust),
        ]
    }

    fn apply(level: &mut StockLevel, op: Op) -> Result<(), StockError> {
        match op {
            Op::Reserve(q) => level.reserve(q),
            Op::Release(q) => level.release(q),
            Op::ConfirmReserved(q) => level.consume_reserved(q),
            Op::Receive(q) => level.receive(q),
            Op::Adjust(d) => level.adjust(d),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Both quantities stay non-negative after every operation, for
        /// any sequence of operations.
        #[test]
        fn prop_quantities_never_negative(
            initial in 0..100i32,
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let mut level = StockLevel::new(initial, 0);
            for op in ops {
                let _ = apply(&mut level, op);
                prop_assert!(level.available >= 0);
                prop_assert!(level.reserved >= 0);
            }
        }

        /// On-hand stock (available + reserved) changes only through
        /// receive (adds), confirm (removes the reserved portion) and
        /// adjust; reserve/release merely move quantity between the two
        /// fields.
        #[test]
        fn prop_quantity_is_conserved(
            initial in 0..100i32,
            ops in prop::collection::vec(op_strategy(), 1..40)
        ) {
            let mut level = StockLevel::new(initial, 0);
            let mut expected_on_hand = initial;
            for op in ops {
                let applied = apply(&mut level, op).is_ok();
                if applied {
                    match op {
                        Op::Receive(q) => expected_on_hand += q,
                        Op::ConfirmReserved(q) => expected_on_hand -= q,
                        Op::Adjust(d) => expected_on_hand += d,
                        Op::Reserve(_) | Op::Release(_) => {}
                    }
                }
                prop_assert_eq!(level.on_hand(), expected_on_hand);
            }
        }

        /// A rejected operation leaves the level exactly as it was.
        #[test]
        fn prop_failed_operation_has_no_effect(
            initial_available in 0..30i32,
            initial_reserved in 0..30i32,
            op in op_strategy()
        ) {
            let mut level = StockLevel::new(initial_available, initial_reserved);
            let before = level;
            if apply(&mut level, op).is_err() {
                prop_assert_eq!(level, before);
            }
        }

        /// Reserve followed by release is an identity on the level.
        #[test]
        fn prop_reserve_release_round_trip(
            initial in 0..100i32,
            quantity in 1..100i32
        ) {
            let mut level = StockLevel::new(initial, 0);
            let before = level;
            if level.reserve(quantity).is_ok() {
                level.release(quantity).unwrap();
                prop_assert_eq!(level, before);
            }
        }
    }
}
