//! Stock ledger: the only place quantities are mutated
//!
//! Every operation here is a point mutation on one product's stock row,
//! executed on the caller's transaction: the row is locked with
//! `SELECT ... FOR UPDATE` before it is read, so no stock check can be
//! authorized against a stale value. Locks never span more than one
//! product; engines touching several lines lock them one at a time, which
//! keeps overlapping orders deadlock-free.

use sqlx::PgConnection;
use uuid::Uuid;

use shared::models::StockLevel;

use crate::error::{AppError, AppResult};

/// Lock one product's stock row and read its current level.
pub async fn fetch_for_update(conn: &mut PgConnection, product_id: Uuid) -> AppResult<StockLevel> {
    let row = sqlx::query_as::<_, (i32, i32)>(
        "SELECT available_quantity, reserved_quantity FROM stock_levels WHERE product_id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Stock record for product {}", product_id)))?;

    Ok(StockLevel::new(row.0, row.1))
}

async fn store(conn: &mut PgConnection, product_id: Uuid, level: StockLevel) -> AppResult<()> {
    sqlx::query(
        "UPDATE stock_levels SET available_quantity = $1, reserved_quantity = $2, updated_at = NOW() WHERE product_id = $3",
    )
    .bind(level.available)
    .bind(level.reserved)
    .bind(product_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Move stock from available to reserved. Fails with InsufficientStock
/// when the product cannot cover the quantity.
pub async fn reserve(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<StockLevel> {
    let mut level = fetch_for_update(&mut *conn, product_id).await?;
    level.reserve(quantity)?;
    store(&mut *conn, product_id, level).await?;
    Ok(level)
}

/// Return reserved stock to available (sales order cancellation).
pub async fn release(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<StockLevel> {
    let mut level = fetch_for_update(&mut *conn, product_id).await?;
    level.release(quantity)?;
    store(&mut *conn, product_id, level).await?;
    Ok(level)
}

/// Permanently consume reserved stock (sales order confirmation).
pub async fn consume_reserved(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<StockLevel> {
    let mut level = fetch_for_update(&mut *conn, product_id).await?;
    level.consume_reserved(quantity)?;
    store(&mut *conn, product_id, level).await?;
    Ok(level)
}

/// Credit inbound goods straight to available (purchase order receipt).
pub async fn receive(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<StockLevel> {
    let mut level = fetch_for_update(&mut *conn, product_id).await?;
    level.receive(quantity)?;
    store(&mut *conn, product_id, level).await?;
    Ok(level)
}

/// Direct stock correction; the delta may be negative only while available
/// stays non-negative.
pub async fn adjust(
    conn: &mut PgConnection,
    product_id: Uuid,
    delta: i32,
) -> AppResult<StockLevel> {
    let mut level = fetch_for_update(&mut *conn, product_id).await?;
    level.adjust(delta)?;
    store(&mut *conn, product_id, level).await?;
    Ok(level)
}
