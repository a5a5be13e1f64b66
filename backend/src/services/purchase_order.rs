//! Purchase order engine: ORDERED -> PARTIALLY_RECEIVED -> RECEIVED
//!
//! Creation never touches stock; goods are credited to the ledger as they
//! arrive. A receive call may cover several lines and produces exactly one
//! receipt event; the order status is then re-derived from the line
//! quantities, which are the source of truth. Cancellation is allowed
//! until the order is fully received and performs no stock reversal.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::models::{
    derive_status, plan_receipt, Actor, PurchaseLineState, PurchaseOrderDetail, PurchaseOrderLine,
    PurchaseOrderStatus, ReceiptDetail, ReceiptLine, ReceiptRequestLine,
};
use shared::types::{clamp_limit, format_order_number, PURCHASE_ORDER_PREFIX};
use shared::validation::{normalize_optional_text, validate_quantity, validate_supplier_reference};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditLogService;
use crate::services::stock;

const ORDER_NUMBER_ATTEMPTS: u32 = 8;

/// Default / maximum rows returned by the receipt history listing
const RECEIPT_HISTORY_DEFAULT_LIMIT: i64 = 200;
const RECEIPT_HISTORY_MAX_LIMIT: i64 = 2000;

/// Purchase order engine
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
    audit: AuditLogService,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    /// Reference to a registered supplier; must be active when present
    pub supplier_id: Option<Uuid>,
    /// Free-text fallback, required when no supplier reference is given
    pub supplier_name: Option<String>,
    pub note: Option<String>,
    pub lines: Vec<CreatePurchaseOrderLineInput>,
}

/// One requested purchase order line
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

/// Filters for the receipt history listing
#[derive(Debug, Default, Deserialize)]
pub struct ReceiptHistoryFilter {
    pub received_by: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

struct HeaderRow {
    order_number: String,
    supplier_id: Option<Uuid>,
    supplier_name: String,
    note: Option<String>,
    status: PurchaseOrderStatus,
    created_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
}

impl PurchaseOrderService {
    pub fn new(db: PgPool, audit: AuditLogService) -> Self {
        Self { db, audit }
    }

    /// Create a purchase order in ORDERED state. Stock is unaffected until
    /// goods are received.
    pub async fn create_order(
        &self,
        actor: &Actor,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        validate_supplier_reference(input.supplier_id, input.supplier_name.as_deref())
            .map_err(|msg| AppError::BusinessRuleViolation(msg.to_string()))?;
        if input.lines.is_empty() {
            return Err(AppError::validation(
                "lines",
                "At least one order line is required",
            ));
        }
        for (idx, line) in input.lines.iter().enumerate() {
            validate_quantity(line.quantity).map_err(|msg| AppError::validation("quantity", msg))?;
            if line.unit_cost < Decimal::ZERO {
                return Err(AppError::validation("unit_cost", "Unit cost cannot be negative"));
            }
            if input.lines[..idx].iter().any(|l| l.product_id == line.product_id) {
                return Err(AppError::BusinessRuleViolation(format!(
                    "Duplicate product line in purchase order: {}",
                    line.product_id
                )));
            }
        }
        let note = normalize_optional_text(input.note);

        let mut tx = self.db.begin().await?;

        let (supplier_id, supplier_name) = match input.supplier_id {
            Some(id) => {
                let (code, name, active) = sqlx::query_as::<_, (String, String, bool)>(
                    "SELECT code, name, active FROM suppliers WHERE id = $1",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Supplier not found: {}", id)))?;
                if !active {
                    return Err(AppError::BusinessRuleViolation(format!(
                        "Supplier is inactive: {}",
                        code
                    )));
                }
                (Some(id), name)
            }
            None => {
                let name = input
                    .supplier_name
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
                (None, name)
            }
        };

        let order_number = generate_order_number(&mut tx).await?;
        let (order_id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO purchase_orders (order_number, supplier_id, supplier_name, note, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(&order_number)
        .bind(supplier_id)
        .bind(&supplier_name)
        .bind(&note)
        .bind(PurchaseOrderStatus::Ordered.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        let mut total_quantity = 0;
        for (line_no, line) in input.lines.iter().enumerate() {
            let (sku, name) = sqlx::query_as::<_, (String, String)>(
                "SELECT sku, name FROM products WHERE id = $1",
            )
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", line.product_id)))?;

            sqlx::query(
                r#"
                INSERT INTO purchase_order_lines (order_id, product_id, line_no, ordered_quantity, unit_cost)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line_no as i32)
            .bind(line.quantity)
            .bind(line.unit_cost)
            .execute(&mut *tx)
            .await?;

            total_quantity += line.quantity;
            lines.push(PurchaseOrderLine {
                product_id: line.product_id,
                sku,
                name,
                ordered_quantity: line.quantity,
                received_quantity: 0,
                unit_cost: line.unit_cost,
            });
        }

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "PURCHASE_ORDER_CREATE",
                "PURCHASE_ORDER",
                &order_id.to_string(),
                &format!(
                    "orderNumber={}, supplier={}, itemCount={}, totalQuantity={}",
                    order_number,
                    supplier_name,
                    lines.len(),
                    total_quantity
                ),
            )
            .await;

        Ok(PurchaseOrderDetail {
            id: order_id,
            order_number,
            supplier_id,
            supplier_name,
            note,
            status: PurchaseOrderStatus::Ordered,
            created_at,
            received_at: None,
            lines,
            receipts: Vec::new(),
        })
    }

    /// Receive goods against an open order.
    ///
    /// Without explicit items the full remaining quantity of every line is
    /// received; with items, each must fit within its line's remaining
    /// quantity. All lines received in one call share a single receipt
    /// event and timestamp.
    pub async fn receive_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        items: Option<Vec<ReceiptRequestLine>>,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;

        let header = load_header(&mut tx, order_id).await?;
        if !header.status.accepts_receipts() {
            return Err(AppError::InvalidState(format!(
                "Only ORDERED or PARTIALLY_RECEIVED purchase orders can be received. Current status: {}",
                header.status.as_str()
            )));
        }

        let line_states = load_line_states(&mut tx, order_id).await?;
        let allocations = plan_receipt(&line_states, items.as_deref())?;

        let (receipt_id, received_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO purchase_order_receipts (order_id, received_by)
            VALUES ($1, $2)
            RETURNING id, received_at
            "#,
        )
        .bind(order_id)
        .bind(&actor.username)
        .fetch_one(&mut *tx)
        .await?;

        let mut total_received = 0;
        for allocation in &allocations {
            // One product row locked at a time, in the planned order.
            stock::receive(&mut tx, allocation.product_id, allocation.quantity).await?;

            // Relative update with a remaining-quantity guard: received
            // quantities only ever grow, and never past the ordered amount.
            let updated = sqlx::query(
                r#"
                UPDATE purchase_order_lines
                SET received_quantity = received_quantity + $1
                WHERE order_id = $2 AND product_id = $3
                  AND received_quantity + $1 <= ordered_quantity
                "#,
            )
            .bind(allocation.quantity)
            .bind(order_id)
            .bind(allocation.product_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() == 0 {
                return Err(AppError::BusinessRuleViolation(format!(
                    "Received quantity exceeds remaining for product {}",
                    allocation.product_id
                )));
            }

            sqlx::query(
                "INSERT INTO purchase_order_receipt_lines (receipt_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(receipt_id)
            .bind(allocation.product_id)
            .bind(allocation.quantity)
            .execute(&mut *tx)
            .await?;

            total_received += allocation.quantity;
        }

        // Status is derived from the line quantities after every receipt; a
        // single call can close the order straight from ORDERED.
        let refreshed = load_line_states(&mut tx, order_id).await?;
        let next_status = derive_status(&refreshed);
        if next_status == PurchaseOrderStatus::Received {
            sqlx::query(
                "UPDATE purchase_orders SET status = $1, received_at = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(next_status.as_str())
            .bind(received_at)
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("UPDATE purchase_orders SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(next_status.as_str())
                .bind(order_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "PURCHASE_ORDER_RECEIVE",
                "PURCHASE_ORDER",
                &order_id.to_string(),
                &format!(
                    "orderNumber={}, receivedQuantity={}, receivedBy={}",
                    header.order_number, total_received, actor.username
                ),
            )
            .await;

        self.get_order(order_id).await
    }

    /// Cancel an order that has not been fully received. Goods already
    /// received stay in stock; nothing is reversed.
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;

        let header = load_header(&mut tx, order_id).await?;
        if header.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Only ORDERED or PARTIALLY_RECEIVED purchase orders can be cancelled. Current status: {}",
                header.status.as_str()
            )));
        }

        sqlx::query("UPDATE purchase_orders SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(PurchaseOrderStatus::Cancelled.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.audit
            .record(
                actor,
                "PURCHASE_ORDER_CANCEL",
                "PURCHASE_ORDER",
                &order_id.to_string(),
                &format!("orderNumber={}", header.order_number),
            )
            .await;

        self.get_order(order_id).await
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut conn = self.db.acquire().await?;
        let header = load_header(&mut conn, order_id).await?;
        let lines = load_lines(&mut conn, order_id).await?;
        let receipts = load_receipts(&mut conn, order_id).await?;

        Ok(PurchaseOrderDetail {
            id: order_id,
            order_number: header.order_number,
            supplier_id: header.supplier_id,
            supplier_name: header.supplier_name,
            note: header.note,
            status: header.status,
            created_at: header.created_at,
            received_at: header.received_at,
            lines,
            receipts,
        })
    }

    pub async fn list_orders(&self) -> AppResult<Vec<PurchaseOrderDetail>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM purchase_orders ORDER BY created_at DESC",
        )
        .fetch_all(&self.db)
        .await?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            orders.push(self.get_order(id).await?);
        }
        Ok(orders)
    }

    /// Receipt history for one order, newest first.
    pub async fn list_receipts(
        &self,
        order_id: Uuid,
        filter: ReceiptHistoryFilter,
    ) -> AppResult<Vec<ReceiptDetail>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_orders WHERE id = $1)",
        )
        .bind(order_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound(format!(
                "Purchase order not found: {}",
                order_id
            )));
        }

        let limit = clamp_limit(
            filter.limit,
            RECEIPT_HISTORY_DEFAULT_LIMIT,
            RECEIPT_HISTORY_MAX_LIMIT,
        );
        let receipt_rows = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
            r#"
            SELECT id, received_by, received_at
            FROM purchase_order_receipts
            WHERE order_id = $1
              AND ($2::varchar IS NULL OR received_by = $2)
              AND ($3::timestamptz IS NULL OR received_at >= $3)
              AND ($4::timestamptz IS NULL OR received_at <= $4)
            ORDER BY received_at DESC
            LIMIT $5
            "#,
        )
        .bind(order_id)
        .bind(&filter.received_by)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut conn = self.db.acquire().await?;
        assemble_receipts(&mut conn, receipt_rows).await
    }
}

async fn load_header(conn: &mut PgConnection, order_id: Uuid) -> AppResult<HeaderRow> {
    let row = sqlx::query_as::<_, (
        String,
        Option<Uuid>,
        String,
        Option<String>,
        String,
        DateTime<Utc>,
        Option<DateTime<Utc>>,
    )>(
        r#"
        SELECT order_number, supplier_id, supplier_name, note, status, created_at, received_at
        FROM purchase_orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Purchase order not found: {}", order_id)))?;

    Ok(HeaderRow {
        order_number: row.0,
        supplier_id: row.1,
        supplier_name: row.2,
        note: row.3,
        status: parse_status(&row.4)?,
        created_at: row.5,
        received_at: row.6,
    })
}

async fn load_line_states(
    conn: &mut PgConnection,
    order_id: Uuid,
) -> AppResult<Vec<PurchaseLineState>> {
    let rows = sqlx::query_as::<_, (Uuid, i32, i32)>(
        r#"
        SELECT product_id, ordered_quantity, received_quantity
        FROM purchase_order_lines
        WHERE order_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| PurchaseLineState {
            product_id: r.0,
            ordered_quantity: r.1,
            received_quantity: r.2,
        })
        .collect())
}

async fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<PurchaseOrderLine>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String, i32, i32, Decimal)>(
        r#"
        SELECT l.product_id, p.sku, p.name, l.ordered_quantity, l.received_quantity, l.unit_cost
        FROM purchase_order_lines l
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
        .map(|r| PurchaseOrderLine {
            product_id: r.0,
            sku: r.1,
            name: r.2,
            ordered_quantity: r.3,
            received_quantity: r.4,
            unit_cost: r.5,
        })
        .collect())
}

async fn load_receipts(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<ReceiptDetail>> {
    let receipt_rows = sqlx::query_as::<_, (Uuid, String, DateTime<Utc>)>(
        r#"
        SELECT id, received_by, received_at
        FROM purchase_order_receipts
        WHERE order_id = $1
        ORDER BY received_at ASC
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    assemble_receipts(conn, receipt_rows).await
}

async fn assemble_receipts(
    conn: &mut PgConnection,
    receipt_rows: Vec<(Uuid, String, DateTime<Utc>)>,
) -> AppResult<Vec<ReceiptDetail>> {
    let receipt_ids: Vec<Uuid> = receipt_rows.iter().map(|r| r.0).collect();
    let line_rows = sqlx::query_as::<_, (Uuid, Uuid, String, String, i32)>(
        r#"
        SELECT rl.receipt_id, rl.product_id, p.sku, p.name, rl.quantity
        FROM purchase_order_receipt_lines rl
        JOIN products p ON p.id = rl.product_id
        WHERE rl.receipt_id = ANY($1)
        ORDER BY rl.receipt_id
        "#,
    )
    .bind(&receipt_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(receipt_rows
        .into_iter()
        .map(|(id, received_by, received_at)| ReceiptDetail {
            id,
            received_by,
            received_at,
            lines: line_rows
                .iter()
                .filter(|l| l.0 == id)
                .map(|l| ReceiptLine {
                    product_id: l.1,
                    sku: l.2.clone(),
                    name: l.3.clone(),
                    quantity: l.4,
                })
                .collect(),
        })
        .collect())
}

fn parse_status(value: &str) -> AppResult<PurchaseOrderStatus> {
    PurchaseOrderStatus::parse(value).ok_or_else(|| {
        AppError::InconsistentState(format!("Unknown purchase order status: {}", value))
    })
}

async fn generate_order_number(conn: &mut PgConnection) -> AppResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let suffix: u16 = rand::thread_rng().gen_range(1000..10_000);
        let candidate = format_order_number(PURCHASE_ORDER_PREFIX, Utc::now(), suffix);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_orders WHERE order_number = $1)",
        )
        .bind(&candidate)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not generate a unique purchase order number"
    )))
}
