//! Replenishment advisor
//!
//! Read-side only: scans the stock snapshot and each product's supplier
//! contracts and recommends reorder quantities. No locks are taken; an
//! eventually-consistent snapshot is acceptable for suggestions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    select_preferred_contract, sort_by_urgency, suggest_quantity, ReplenishmentSuggestion,
    SupplierContract,
};

use crate::error::AppResult;

/// Replenishment suggestion reader
#[derive(Clone)]
pub struct ReplenishmentService {
    db: PgPool,
}

impl ReplenishmentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Suggestions for every product at or below its reorder point,
    /// most urgent first. Products with no reorder policy are omitted.
    pub async fn list_suggestions(&self) -> AppResult<Vec<ReplenishmentSuggestion>> {
        let product_rows = sqlx::query_as::<_, (Uuid, String, String, i32, i32, i32, i32)>(
            r#"
            SELECT p.id, p.sku, p.name, p.reorder_point, p.reorder_quantity,
                   s.available_quantity, s.reserved_quantity
            FROM products p
            JOIN stock_levels s ON s.product_id = p.id
            ORDER BY s.available_quantity ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let product_ids: Vec<Uuid> = product_rows.iter().map(|r| r.0).collect();
        let contracts = self.load_active_contracts(&product_ids).await?;

        let mut suggestions = Vec::new();
        for (product_id, sku, name, reorder_point, reorder_quantity, available, reserved) in
            product_rows
        {
            let product_contracts: Vec<SupplierContract> = contracts
                .iter()
                .filter(|c| c.product_id == product_id)
                .cloned()
                .collect();
            let preferred = select_preferred_contract(&product_contracts);

            let (moq, lot_size) = preferred.map(|c| (c.moq, c.lot_size)).unwrap_or((1, 1));
            let Some((shortage, suggested)) =
                suggest_quantity(reorder_point, reorder_quantity, available, moq, lot_size)
            else {
                continue;
            };

            suggestions.push(ReplenishmentSuggestion {
                product_id,
                sku,
                name,
                available_quantity: available,
                reserved_quantity: reserved,
                reorder_point,
                reorder_quantity,
                shortage_quantity: shortage,
                suggested_quantity: suggested,
                supplier_id: preferred.map(|c| c.supplier_id),
                supplier_name: preferred.map(|c| c.supplier_name.clone()),
                unit_cost: preferred.map(|c| c.unit_cost),
                lead_time_days: preferred.map(|c| c.lead_time_days),
            });
        }

        sort_by_urgency(&mut suggestions);
        Ok(suggestions)
    }

    /// Contracts of active suppliers only; a deactivated supplier should
    /// not be suggested for new purchase orders.
    async fn load_active_contracts(
        &self,
        product_ids: &[Uuid],
    ) -> AppResult<Vec<SupplierContract>> {
        let rows = sqlx::query_as::<_, (
            Uuid,
            Uuid,
            Uuid,
            String,
            String,
            Decimal,
            i32,
            i32,
            i32,
            bool,
            DateTime<Utc>,
            DateTime<Utc>,
        )>(
            r#"
            SELECT c.id, c.product_id, c.supplier_id, s.code, s.name,
                   c.unit_cost, c.lead_time_days, c.moq, c.lot_size, c.is_primary,
                   c.created_at, c.updated_at
            FROM supplier_contracts c
            JOIN suppliers s ON s.id = c.supplier_id
            WHERE c.product_id = ANY($1) AND s.active = TRUE
            "#,
        )
        .bind(product_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SupplierContract {
                id: r.0,
                product_id: r.1,
                supplier_id: r.2,
                supplier_code: r.3,
                supplier_name: r.4,
                unit_cost: r.5,
                lead_time_days: r.6,
                moq: r.7,
                lot_size: r.8,
                is_primary: r.9,
                created_at: r.10,
                updated_at: r.11,
            })
            .collect())
    }
}
