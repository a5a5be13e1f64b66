//! Product-supplier contract service
//!
//! Contracts carry the purchasing terms the replenishment advisor reads.
//! At most one contract per product is primary: flagging a contract as
//! primary demotes any other primary contract of the same product in the
//! same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    normalize_lead_time, normalize_lot_size, normalize_moq, Actor, SupplierContract,
};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditLogService;

/// Product-supplier contract registry
#[derive(Clone)]
pub struct SupplierContractService {
    db: PgPool,
    audit: AuditLogService,
}

/// Input for creating or updating a contract
#[derive(Debug, Deserialize)]
pub struct UpsertContractInput {
    pub supplier_id: Uuid,
    pub unit_cost: Decimal,
    pub lead_time_days: Option<i32>,
    pub moq: Option<i32>,
    pub lot_size: Option<i32>,
    pub is_primary: bool,
}

impl SupplierContractService {
    pub fn new(db: PgPool, audit: AuditLogService) -> Self {
        Self { db, audit }
    }

    /// Create or update the contract between one product and one supplier.
    pub async fn upsert_contract(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: UpsertContractInput,
    ) -> AppResult<SupplierContract> {
        if input.unit_cost < Decimal::ZERO {
            return Err(AppError::validation("unit_cost", "Unit cost cannot be negative"));
        }

        let mut tx = self.db.begin().await?;

        let product_sku = sqlx::query_scalar::<_, String>("SELECT sku FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", product_id)))?;

        let (supplier_code, supplier_name, active) = sqlx::query_as::<_, (String, String, bool)>(
            "SELECT code, name, active FROM suppliers WHERE id = $1",
        )
        .bind(input.supplier_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Supplier not found: {}", input.supplier_id)))?;
        if !active {
            return Err(AppError::BusinessRuleViolation(format!(
                "Supplier is inactive: {}",
                supplier_code
            )));
        }

        let lead_time_days = normalize_lead_time(input.lead_time_days);
        let moq = normalize_moq(input.moq);
        let lot_size = normalize_lot_size(input.lot_size);

        let (contract_id, created_at, updated_at) =
            sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO supplier_contracts
                    (product_id, supplier_id, unit_cost, lead_time_days, moq, lot_size, is_primary)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (product_id, supplier_id) DO UPDATE
                SET unit_cost = EXCLUDED.unit_cost,
                    lead_time_days = EXCLUDED.lead_time_days,
                    moq = EXCLUDED.moq,
                    lot_size = EXCLUDED.lot_size,
                    is_primary = EXCLUDED.is_primary,
                    updated_at = NOW()
                RETURNING id, created_at, updated_at
                "#,
            )
            .bind(product_id)
            .bind(input.supplier_id)
            .bind(input.unit_cost)
            .bind(lead_time_days)
            .bind(moq)
            .bind(lot_size)
            .bind(input.is_primary)
            .fetch_one(&mut *tx)
            .await?;

        if input.is_primary {
            // Converge on a single primary contract per product.
            sqlx::query(
                r#"
                UPDATE supplier_contracts
                SET is_primary = FALSE, updated_at = NOW()
                WHERE product_id = $1 AND id <> $2 AND is_primary
                "#,
            )
            .bind(product_id)
            .bind(contract_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "PRODUCT_SUPPLIER_UPSERT",
                "PRODUCT",
                &product_id.to_string(),
                &format!(
                    "productSku={}, supplierCode={}, unitCost={}, primary={}",
                    product_sku, supplier_code, input.unit_cost, input.is_primary
                ),
            )
            .await;

        Ok(SupplierContract {
            id: contract_id,
            product_id,
            supplier_id: input.supplier_id,
            supplier_code,
            supplier_name,
            unit_cost: input.unit_cost,
            lead_time_days,
            moq,
            lot_size,
            is_primary: input.is_primary,
            created_at,
            updated_at,
        })
    }

    /// Remove the contract between one product and one supplier.
    pub async fn remove_contract(
        &self,
        actor: &Actor,
        product_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<()> {
        let supplier_code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT s.code
            FROM supplier_contracts c
            JOIN suppliers s ON s.id = c.supplier_id
            WHERE c.product_id = $1 AND c.supplier_id = $2
            "#,
        )
        .bind(product_id)
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Product-supplier contract not found: productId={}, supplierId={}",
                product_id, supplier_id
            ))
        })?;

        sqlx::query("DELETE FROM supplier_contracts WHERE product_id = $1 AND supplier_id = $2")
            .bind(product_id)
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        self.audit
            .record(
                actor,
                "PRODUCT_SUPPLIER_UNLINK",
                "PRODUCT",
                &product_id.to_string(),
                &format!("supplierCode={}", supplier_code),
            )
            .await;

        Ok(())
    }

    /// Contracts of one product, primary first, then cheapest.
    pub async fn list_contracts(&self, product_id: Uuid) -> AppResult<Vec<SupplierContract>> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound(format!(
                "Product not found: {}",
                product_id
            )));
        }

        let rows = sqlx::query_as::<_, ContractRow>(
            r#"
            SELECT c.id, c.product_id, c.supplier_id, s.code, s.name,
                   c.unit_cost, c.lead_time_days, c.moq, c.lot_size, c.is_primary,
                   c.created_at, c.updated_at
            FROM supplier_contracts c
            JOIN suppliers s ON s.id = c.supplier_id
            WHERE c.product_id = $1
            ORDER BY c.is_primary DESC, c.unit_cost ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(row_into_contract).collect())
    }
}

type ContractRow = (
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
);

fn row_into_contract(row: ContractRow) -> SupplierContract {
    SupplierContract {
        id: row.0,
        product_id: row.1,
        supplier_id: row.2,
        supplier_code: row.3,
        supplier_name: row.4,
        unit_cost: row.5,
        lead_time_days: row.6,
        moq: row.7,
        lot_size: row.8,
        is_primary: row.9,
        created_at: row.10,
        updated_at: row.11,
    }
}
