//! Replenishment advisor tests
//!
//! Tests for the suggestion math:
//! - Threshold: only products at or below the reorder point qualify
//! - Quantity: covers the shortage plus one reorder quantity, lifted to
//!   the contract MOQ and rounded up to the lot size
//! - Ordering: most urgent restocks first

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::models::{
    select_preferred_contract, sort_by_urgency, suggest_quantity, ReplenishmentSuggestion,
    SupplierContract,
};
use uuid::Uuid;

fn contract(unit_cost: i64, moq: i32, lot_size: i32, is_primary: bool) -> SupplierContract {
    let now = chrono::Utc::now();
    SupplierContract {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        supplier_id: Uuid::new_v4(),
        supplier_code: "SUP-1".to_string(),
        supplier_name: "Supplier One".to_string(),
        unit_cost: Decimal::new(unit_cost, 2),
        lead_time_days: 5,
        moq,
        lot_size,
        is_primary,
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The worked example: availableQuantity=0, reorderPoint=10,
    /// reorderQuantity=7 under a moq=12 / lotSize=10 contract.
    #[test]
    fn test_rounding_example() {
        let (shortage, suggested) = suggest_quantity(10, 7, 0, 12, 10).unwrap();
        assert_eq!(shortage, 10);
        assert_eq!(suggested, 20);
    }

    #[test]
    fn test_products_above_threshold_are_omitted() {
        assert!(suggest_quantity(10, 5, 11, 1, 1).is_none());
        assert!(suggest_quantity(10, 5, 10, 1, 1).is_some());
        assert!(suggest_quantity(10, 5, 0, 1, 1).is_some());
    }

    #[test]
    fn test_zero_reorder_quantity_disables_suggestions() {
        assert!(suggest_quantity(100, 0, 0, 1, 1).is_none());
    }

    #[test]
    fn test_no_contract_means_no_floors() {
        // Without a contract, moq and lot size both default to 1.
        let (shortage, suggested) = suggest_quantity(10, 7, 0, 1, 1).unwrap();
        assert_eq!(shortage, 10);
        assert_eq!(suggested, 17);
    }

    #[test]
    fn test_primary_contract_beats_cheaper_secondary() {
        let contracts = vec![contract(300, 1, 1, false), contract(800, 12, 10, true)];
        let preferred = select_preferred_contract(&contracts).unwrap();
        assert!(preferred.is_primary);
        assert_eq!(preferred.moq, 12);
    }

    #[test]
    fn test_cheapest_contract_without_primary() {
        let contracts = vec![
            contract(800, 5, 1, false),
            contract(300, 7, 2, false),
            contract(500, 9, 3, false),
        ];
        let preferred = select_preferred_contract(&contracts).unwrap();
        assert_eq!(preferred.unit_cost, Decimal::new(300, 2));
    }

    #[test]
    fn test_most_urgent_first() {
        let mk = |shortage, available| ReplenishmentSuggestion {
            product_id: Uuid::new_v4(),
            sku: String::new(),
            name: String::new(),
            available_quantity: available,
            reserved_quantity: 0,
            reorder_point: 0,
            reorder_quantity: 0,
            shortage_quantity: shortage,
            suggested_quantity: 0,
            supplier_id: None,
            supplier_name: None,
            unit_cost: None,
            lead_time_days: None,
        };
        let mut suggestions = vec![mk(2, 5), mk(8, 0), mk(8, 2)];
        sort_by_urgency(&mut suggestions);

        assert_eq!(suggestions[0].shortage_quantity, 8);
        assert_eq!(suggestions[0].available_quantity, 0);
        assert_eq!(suggestions[1].shortage_quantity, 8);
        assert_eq!(suggestions[1].available_quantity, 2);
        assert_eq!(suggestions[2].shortage_quantity, 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Any produced suggestion covers the shortage plus one reorder
        /// quantity, respects the MOQ, and lands on a lot multiple.
        #[test]
        fn prop_suggestion_respects_all_floors(
            reorder_point in 0..50i32,
            reorder_quantity in 1..50i32,
            available in 0..50i32,
            moq in 1..40i32,
            lot_size in 1..20i32
        ) {
            if let Some((shortage, suggested)) =
                suggest_quantity(reorder_point, reorder_quantity, available, moq, lot_size)
            {
                prop_assert_eq!(shortage, (reorder_point - available).max(0));
                prop_assert!(suggested >= shortage + reorder_quantity);
                prop_assert!(suggested >= moq);
                if lot_size > 1 {
                    prop_assert_eq!(suggested % lot_size, 0);
                }
            } else {
                // Only disqualified products are omitted.
                prop_assert!(available > reorder_point);
            }
        }

        /// Lot rounding never adds a full extra lot.
        #[test]
        fn prop_rounding_is_minimal(
            reorder_point in 0..50i32,
            reorder_quantity in 1..50i32,
            available in 0..50i32,
            moq in 1..40i32,
            lot_size in 2..20i32
        ) {
            if let Some((shortage, suggested)) =
                suggest_quantity(reorder_point, reorder_quantity, available, moq, lot_size)
            {
                let base = (shortage + reorder_quantity).max(moq);
                prop_assert!(suggested >= base);
                prop_assert!(suggested < base + lot_size);
            }
        }

        /// Sorting is stable on the urgency criteria: shortages descend,
        /// and within equal shortages available quantities ascend.
        #[test]
        fn prop_urgency_ordering_holds(
            entries in prop::collection::vec((0..30i32, 0..30i32), 1..10)
        ) {
            let mut suggestions: Vec<ReplenishmentSuggestion> = entries
                .into_iter()
                .map(|(shortage, available)| ReplenishmentSuggestion {
                    product_id: Uuid::new_v4(),
                    sku: String::new(),
                    name: String::new(),
                    available_quantity: available,
                    reserved_quantity: 0,
                    reorder_point: 0,
                    reorder_quantity: 0,
                    shortage_quantity: shortage,
                    suggested_quantity: 0,
                    supplier_id: None,
                    supplier_name: None,
                    unit_cost: None,
                    lead_time_days: None,
                })
                .collect();

            sort_by_urgency(&mut suggestions);

            for pair in suggestions.windows(2) {
                prop_assert!(pair[0].shortage_quantity >= pair[1].shortage_quantity);
                if pair[0].shortage_quantity == pair[1].shortage_quantity {
                    prop_assert!(pair[0].available_quantity <= pair[1].available_quantity);
                }
            }
        }
    }
}
