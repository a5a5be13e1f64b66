//! Product catalog service
//!
//! Owns product identity and the creation of the matching stock row; the
//! stock row is born together with its product and is never deleted while
//! the product exists. Non-quantity fields are last-writer-wins; quantity
//! corrections go through the stock ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::models::{Actor, Product, ProductWithStock};
use shared::validation::{normalize_optional_text, validate_required_text};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditLogService;
use crate::services::stock;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    audit: AuditLogService,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub unit_price: Decimal,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    /// Opening balance credited to available stock
    pub initial_quantity: Option<i32>,
}

/// Input for updating a product's non-quantity fields
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
}

/// Input for a direct stock correction
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    pub delta: i32,
    pub reason: Option<String>,
}

impl ProductService {
    pub fn new(db: PgPool, audit: AuditLogService) -> Self {
        Self { db, audit }
    }

    /// Create a product and its stock row atomically.
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: CreateProductInput,
    ) -> AppResult<ProductWithStock> {
        validate_required_text(&input.sku).map_err(|msg| AppError::validation("sku", msg))?;
        validate_required_text(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        if input.unit_price < Decimal::ZERO {
            return Err(AppError::validation("unit_price", "Unit price cannot be negative"));
        }
        let initial_quantity = input.initial_quantity.unwrap_or(0);
        if initial_quantity < 0 {
            return Err(AppError::validation(
                "initial_quantity",
                "Initial quantity cannot be negative",
            ));
        }
        let sku = input.sku.trim().to_string();
        let name = input.name.trim().to_string();
        let reorder_point = input.reorder_point.unwrap_or(0).max(0);
        let reorder_quantity = input.reorder_quantity.unwrap_or(0).max(0);

        let mut tx = self.db.begin().await?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE LOWER(sku) = LOWER($1))",
        )
        .bind(&sku)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::BusinessRuleViolation(format!(
                "SKU already exists: {}",
                sku
            )));
        }

        let (product_id, created_at, updated_at) =
            sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO products (sku, name, unit_price, reorder_point, reorder_quantity)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, created_at, updated_at
                "#,
            )
            .bind(&sku)
            .bind(&name)
            .bind(input.unit_price)
            .bind(reorder_point)
            .bind(reorder_quantity)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO stock_levels (product_id, available_quantity, reserved_quantity) VALUES ($1, $2, 0)",
        )
        .bind(product_id)
        .bind(initial_quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "PRODUCT_CREATE",
                "PRODUCT",
                &product_id.to_string(),
                &format!("sku={}, name={}", sku, name),
            )
            .await;

        Ok(ProductWithStock {
            product: Product {
                id: product_id,
                sku,
                name,
                unit_price: input.unit_price,
                reorder_point,
                reorder_quantity,
                created_at,
                updated_at,
            },
            available_quantity: initial_quantity,
            reserved_quantity: 0,
        })
    }

    /// Update non-quantity fields. Plain last-writer-wins; concurrent
    /// writers are not arbitrated here.
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductWithStock> {
        let existing = self.get_product(product_id).await?;

        let name = match normalize_optional_text(input.name) {
            Some(name) => name,
            None => existing.product.name,
        };
        let unit_price = input.unit_price.unwrap_or(existing.product.unit_price);
        if unit_price < Decimal::ZERO {
            return Err(AppError::validation("unit_price", "Unit price cannot be negative"));
        }
        let reorder_point = input
            .reorder_point
            .unwrap_or(existing.product.reorder_point)
            .max(0);
        let reorder_quantity = input
            .reorder_quantity
            .unwrap_or(existing.product.reorder_quantity)
            .max(0);

        sqlx::query(
            r#"
            UPDATE products
            SET name = $1, unit_price = $2, reorder_point = $3, reorder_quantity = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&name)
        .bind(unit_price)
        .bind(reorder_point)
        .bind(reorder_quantity)
        .bind(product_id)
        .execute(&self.db)
        .await?;

        self.audit
            .record(
                actor,
                "PRODUCT_UPDATE",
                "PRODUCT",
                &product_id.to_string(),
                &format!("sku={}, name={}", existing.product.sku, name),
            )
            .await;

        self.get_product(product_id).await
    }

    /// Direct stock correction through the ledger.
    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<ProductWithStock> {
        if input.delta == 0 {
            return Err(AppError::validation("delta", "Adjustment delta must not be zero"));
        }
        let reason = normalize_optional_text(input.reason);

        let mut tx = self.db.begin().await?;

        let sku = sqlx::query_scalar::<_, String>("SELECT sku FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", product_id)))?;

        stock::adjust(&mut tx, product_id, input.delta).await?;

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "STOCK_ADJUST",
                "PRODUCT",
                &product_id.to_string(),
                &format!(
                    "sku={}, delta={}, reason={}",
                    sku,
                    input.delta,
                    reason.as_deref().unwrap_or("-")
                ),
            )
            .await;

        self.get_product(product_id).await
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductWithStock> {
        let mut conn = self.db.acquire().await?;
        fetch_product_with_stock(&mut conn, product_id).await
    }

    pub async fn list_products(&self) -> AppResult<Vec<ProductWithStock>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT p.id, p.sku, p.name, p.unit_price, p.reorder_point, p.reorder_quantity,
                   p.created_at, p.updated_at, s.available_quantity, s.reserved_quantity
            FROM products p
            JOIN stock_levels s ON s.product_id = p.id
            ORDER BY p.sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(row_into_product).collect())
    }
}

type ProductRow = (
    Uuid,
    String,
    String,
    Decimal,
    i32,
    i32,
    DateTime<Utc>,
    DateTime<Utc>,
    i32,
    i32,
);

fn row_into_product(row: ProductRow) -> ProductWithStock {
    ProductWithStock {
        product: Product {
            id: row.0,
            sku: row.1,
            name: row.2,
            unit_price: row.3,
            reorder_point: row.4,
            reorder_quantity: row.5,
            created_at: row.6,
            updated_at: row.7,
        },
        available_quantity: row.8,
        reserved_quantity: row.9,
    }
}

async fn fetch_product_with_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<ProductWithStock> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT p.id, p.sku, p.name, p.unit_price, p.reorder_point, p.reorder_quantity,
               p.created_at, p.updated_at, s.available_quantity, s.reserved_quantity
        FROM products p
        JOIN stock_levels s ON s.product_id = p.id
        WHERE p.id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", product_id)))?;

    Ok(row_into_product(row))
}
