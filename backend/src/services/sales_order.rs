//! Sales order engine: RESERVED -> CONFIRMED | CANCELLED
//!
//! Creation moves stock from available to reserved line by line inside one
//! transaction, so a failing line rolls back every earlier reservation.
//! Confirmation consumes the reserved portion for good; cancellation gives
//! it back. Header transitions are additionally guarded by an optimistic
//! version counter layered on top of the per-product row locks.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::models::{Actor, SalesOrderDetail, SalesOrderLine, SalesOrderStatus};
use shared::types::{format_order_number, SALES_ORDER_PREFIX};
use shared::validation::{validate_quantity, validate_required_text};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditLogService;
use crate::services::stock;

/// Attempts at a unique order number before giving up
const ORDER_NUMBER_ATTEMPTS: u32 = 8;

/// Sales order engine
#[derive(Clone)]
pub struct SalesOrderService {
    db: PgPool,
    audit: AuditLogService,
}

/// Input for creating a sales order
#[derive(Debug, Deserialize)]
pub struct CreateSalesOrderInput {
    pub customer_name: String,
    pub lines: Vec<CreateSalesOrderLineInput>,
}

/// One requested order line
#[derive(Debug, Deserialize)]
pub struct CreateSalesOrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

struct HeaderRow {
    order_number: String,
    customer_name: String,
    status: SalesOrderStatus,
    version: i32,
    created_at: DateTime<Utc>,
}

impl SalesOrderService {
    pub fn new(db: PgPool, audit: AuditLogService) -> Self {
        Self { db, audit }
    }

    /// Create a sales order and reserve stock for every line,
    /// all-or-nothing.
    pub async fn create_order(
        &self,
        actor: &Actor,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        validate_required_text(&input.customer_name)
            .map_err(|msg| AppError::validation("customer_name", msg))?;
        if input.lines.is_empty() {
            return Err(AppError::validation(
                "lines",
                "At least one order line is required",
            ));
        }
        for line in &input.lines {
            validate_quantity(line.quantity).map_err(|msg| AppError::validation("quantity", msg))?;
        }
        let customer_name = input.customer_name.trim().to_string();

        let mut tx = self.db.begin().await?;

        let order_number = generate_order_number(&mut tx).await?;
        let (order_id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO sales_orders (order_number, customer_name, status, version)
            VALUES ($1, $2, $3, 0)
            RETURNING id, created_at
            "#,
        )
        .bind(&order_number)
        .bind(&customer_name)
        .bind(SalesOrderStatus::Reserved.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for (line_no, line) in input.lines.iter().enumerate() {
            let (sku, name, unit_price) = sqlx::query_as::<_, (String, String, Decimal)>(
                "SELECT sku, name, unit_price FROM products WHERE id = $1",
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", line.product_id)))?;

            // Lines are processed in the order supplied; a failure here
            // aborts the transaction and with it every earlier reservation.
            stock::reserve(&mut tx, line.product_id, line.quantity).await?;

            sqlx::query(
                r#"
                INSERT INTO sales_order_lines (order_id, product_id, line_no, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line_no as i32)
            .bind(line.quantity)
            .bind(unit_price)
            .execute(&mut *tx)
            .await?;

            lines.push(SalesOrderLine {
                product_id: line.product_id,
                sku,
                name,
                quantity: line.quantity,
                unit_price,
            });
        }

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "ORDER_CREATE",
                "SALES_ORDER",
                &order_id.to_string(),
                &format!("orderNumber={}, customer={}", order_number, customer_name),
            )
            .await;

        Ok(SalesOrderDetail {
            id: order_id,
            order_number,
            customer_name,
            status: SalesOrderStatus::Reserved,
            version: 0,
            created_at,
            lines,
        })
    }

    /// Confirm a RESERVED order: the reserved stock is consumed for good.
    pub async fn confirm_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let header = load_header(&mut tx, order_id).await?;
        if header.status != SalesOrderStatus::Reserved {
            return Err(AppError::InvalidState(format!(
                "Only RESERVED orders can be confirmed. Current status: {}",
                header.status.as_str()
            )));
        }

        let lines = load_lines(&mut tx, order_id).await?;
        for line in &lines {
            stock::consume_reserved(&mut tx, line.product_id, line.quantity).await?;
        }

        transition_header(&mut tx, order_id, SalesOrderStatus::Confirmed, header.version).await?;
        tx.commit().await?;

        self.audit
            .record(
                actor,
                "ORDER_CONFIRM",
                "SALES_ORDER",
                &order_id.to_string(),
                &format!("orderNumber={}", header.order_number),
            )
            .await;

        Ok(SalesOrderDetail {
            id: order_id,
            order_number: header.order_number,
            customer_name: header.customer_name,
            status: SalesOrderStatus::Confirmed,
            version: header.version + 1,
            created_at: header.created_at,
            lines,
        })
    }

    /// Cancel a RESERVED order: reserved stock flows back to available.
    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<SalesOrderDetail> {
        let mut tx = self.db.begin().await?;

        let header = load_header(&mut tx, order_id).await?;
        if header.status != SalesOrderStatus::Reserved {
            return Err(AppError::InvalidState(format!(
                "Only RESERVED orders can be cancelled. Current status: {}",
                header.status.as_str()
            )));
        }

        let lines = load_lines(&mut tx, order_id).await?;
        for line in &lines {
            stock::release(&mut tx, line.product_id, line.quantity).await?;
        }

        transition_header(&mut tx, order_id, SalesOrderStatus::Cancelled, header.version).await?;
        tx.commit().await?;

        self.audit
            .record(
                actor,
                "ORDER_CANCEL",
                "SALES_ORDER",
                &order_id.to_string(),
                &format!("orderNumber={}", header.order_number),
            )
            .await;

        Ok(SalesOrderDetail {
            id: order_id,
            order_number: header.order_number,
            customer_name: header.customer_name,
            status: SalesOrderStatus::Cancelled,
            version: header.version + 1,
            created_at: header.created_at,
            lines,
        })
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<SalesOrderDetail> {
        let mut conn = self.db.acquire().await?;
        let header = load_header(&mut conn, order_id).await?;
        let lines = load_lines(&mut conn, order_id).await?;
        Ok(SalesOrderDetail {
            id: order_id,
            order_number: header.order_number,
            customer_name: header.customer_name,
            status: header.status,
            version: header.version,
            created_at: header.created_at,
            lines,
        })
    }

    pub async fn list_orders(&self) -> AppResult<Vec<SalesOrderDetail>> {
        let headers = sqlx::query_as::<_, (Uuid, String, String, String, i32, DateTime<Utc>)>(
            r#"
            SELECT id, order_number, customer_name, status, version, created_at
            FROM sales_orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.0).collect();
        let line_rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, i32, Decimal)>(
            r#"
            SELECT l.order_id, l.product_id, p.sku, p.name, l.quantity, l.unit_price
            FROM sales_order_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.order_id = ANY($1)
            ORDER BY l.order_id, l.line_no
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut orders = Vec::with_capacity(headers.len());
        for (id, order_number, customer_name, status, version, created_at) in headers {
            let status = parse_status(&status)?;
            let lines = line_rows
                .iter()
                .filter(|r| r.0 == id)
                .map(|r| SalesOrderLine {
                    product_id: r.1,
                    sku: r.2.clone(),
                    name: r.3.clone(),
                    quantity: r.4,
                    unit_price: r.5,
                })
                .collect();
            orders.push(SalesOrderDetail {
                id,
                order_number,
                customer_name,
                status,
                version,
                created_at,
                lines,
            });
        }
        Ok(orders)
    }
}

async fn load_header(conn: &mut PgConnection, order_id: Uuid) -> AppResult<HeaderRow> {
    let row = sqlx::query_as::<_, (String, String, String, i32, DateTime<Utc>)>(
        r#"
        SELECT order_number, customer_name, status, version, created_at
        FROM sales_orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Sales order not found: {}", order_id)))?;

    Ok(HeaderRow {
        order_number: row.0,
        customer_name: row.1,
        status: parse_status(&row.2)?,
        version: row.3,
        created_at: row.4,
    })
}

async fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<SalesOrderLine>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, i32, Decimal)>(
        r#"
        SELECT l.product_id, p.sku, p.name, l.quantity, l.unit_price
        FROM sales_order_lines l
        JOIN products p ON p.id = l.product_id
        WHERE l.order_id = $1
        ORDER BY l.line_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SalesOrderLine {
            product_id: r.0,
            sku: r.1,
            name: r.2,
            quantity: r.3,
            unit_price: r.4,
        })
        .collect())
}

/// Compare-and-swap write of the header status; a version mismatch means a
/// concurrent transition won, and this whole transaction is rolled back.
async fn transition_header(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: SalesOrderStatus,
    expected_version: i32,
) -> AppResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE sales_orders
        SET status = $1, version = version + 1, updated_at = NOW()
        WHERE id = $2 AND version = $3
        "#,
    )
    .bind(status.as_str())
    .bind(order_id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::InvalidState(
            "Order was modified concurrently; transition aborted".to_string(),
        ));
    }
    Ok(())
}

fn parse_status(value: &str) -> AppResult<SalesOrderStatus> {
    SalesOrderStatus::parse(value)
        .ok_or_else(|| AppError::InconsistentState(format!("Unknown sales order status: {}", value)))
}

/// Generate an order number, retrying on the (unlikely) collision. The
/// uniqueness is checked against storage, not guaranteed by construction.
async fn generate_order_number(conn: &mut PgConnection) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let suffix: u16 = rand::thread_rng().gen_range(1000..10_000);
        let candidate = format_order_number(SALES_ORDER_PREFIX, Utc::now(), suffix);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM sales_orders WHERE order_number = $1)",
        )
        .bind(&candidate)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not generate a unique sales order number"
    )))
}
