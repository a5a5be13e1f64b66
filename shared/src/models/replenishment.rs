//! Replenishment advisor math
//!
//! Pure read-side computation: given a stock snapshot and the preferred
//! supplier contract, recommend how much to reorder. No side effects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recommended reorder for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishmentSuggestion {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub shortage_quantity: i32,
    pub suggested_quantity: i32,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub lead_time_days: Option<i32>,
}

/// Shortage and suggested quantity for a product under its reorder policy,
/// or `None` when the product does not qualify for a suggestion.
///
/// Sub-zero reorder parameters are treated as 0, matching how stored
/// values are normalized on the way in.
pub fn suggest_quantity(
    reorder_point: i32,
    reorder_quantity: i32,
    available_quantity: i32,
    moq: i32,
    lot_size: i32,
) -> Option<(i32, i32)> {
    let reorder_point = reorder_point.max(0);
    let reorder_quantity = reorder_quantity.max(0);

    if reorder_quantity == 0 || available_quantity > reorder_point {
        return None;
    }

    let shortage = (reorder_point - available_quantity).max(0);
    let base = reorder_quantity.max(shortage + reorder_quantity);
    let mut suggested = base.max(moq.max(1));

    let lot_size = lot_size.max(1);
    if lot_size > 1 && suggested % lot_size != 0 {
        suggested = (suggested / lot_size + 1) * lot_size;
    }

    Some((shortage, suggested))
}

/// Order suggestions most-urgent-first: largest shortage, then least
/// available stock.
pub fn sort_by_urgency(suggestions: &mut [ReplenishmentSuggestion]) {
    suggestions.sort_by(|a, b| {
        b.shortage_quantity
            .cmp(&a.shortage_quantity)
            .then(a.available_quantity.cmp(&b.available_quantity))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worked_rounding_example() {
        // shortage=10, base=max(7,17)=17, max(17, moq 12)=17, rounded up to
        // the next multiple of lot size 10.
        let (shortage, suggested) = suggest_quantity(10, 7, 0, 12, 10).unwrap();
        assert_eq!(shortage, 10);
        assert_eq!(suggested, 20);
    }

    #[test]
    fn no_suggestion_above_reorder_point() {
        assert_eq!(suggest_quantity(10, 5, 11, 1, 1), None);
        // At the reorder point still qualifies.
        assert!(suggest_quantity(10, 5, 10, 1, 1).is_some());
    }

    #[test]
    fn no_suggestion_without_reorder_quantity() {
        assert_eq!(suggest_quantity(10, 0, 0, 1, 1), None);
    }

    #[test]
    fn moq_lifts_small_suggestions() {
        // shortage=2, base=max(5,7)=7, moq 25 wins.
        let (_, suggested) = suggest_quantity(5, 5, 3, 25, 1).unwrap();
        assert_eq!(suggested, 25);
    }

    #[test]
    fn exact_lot_multiples_are_not_rounded() {
        let (_, suggested) = suggest_quantity(10, 10, 0, 1, 10).unwrap();
        assert_eq!(suggested, 20);
    }

    #[test]
    fn urgency_ordering() {
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
        let mut suggestions = vec![mk(1, 9), mk(5, 3), mk(5, 1)];
        sort_by_urgency(&mut suggestions);
        assert_eq!(suggestions[0].shortage_quantity, 5);
        assert_eq!(suggestions[0].available_quantity, 1);
        assert_eq!(suggestions[2].shortage_quantity, 1);
    }
}
