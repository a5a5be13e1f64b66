//! Stock level arithmetic shared by the order engines
//!
//! Every quantity mutation in the system goes through [`StockLevel`]; the
//! backend wraps these checked operations in a row-locked transaction so
//! the invariants hold under concurrent access.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by checked stock mutations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("insufficient stock: available={available}, requested={requested}")]
    Insufficient { available: i32, requested: i32 },

    /// Releasing or consuming more than is reserved means an engine bug,
    /// not a caller mistake.
    #[error("reserved quantity inconsistent: reserved={reserved}, requested={requested}")]
    ReservedInconsistent { reserved: i32, requested: i32 },

    #[error("adjustment would drive available below zero: available={available}, delta={delta}")]
    AdjustBelowZero { available: i32, delta: i32 },

    #[error("quantity must be positive: {0}")]
    NonPositiveQuantity(i32),
}

/// Available / reserved quantities for one product
///
/// Invariant: both fields are >= 0 at all times. `available` is stock that
/// can be sold right now; `reserved` is committed to RESERVED sales orders
/// but not yet permanently consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub available: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn new(available: i32, reserved: i32) -> Self {
        Self { available, reserved }
    }

    /// Total units physically on hand, sold or not.
    pub fn on_hand(&self) -> i32 {
        self.available + self.reserved
    }

    /// Move stock from available to reserved (sales order creation).
    pub fn reserve(&mut self, quantity: i32) -> Result<(), StockError> {
        ensure_positive(quantity)?;
        if self.available < quantity {
            return Err(StockError::Insufficient {
                available: self.available,
                requested: quantity,
            });
        }
        self.available -= quantity;
        self.reserved += quantity;
        Ok(())
    }

    /// Move stock back from reserved to available (sales order cancellation).
    pub fn release(&mut self, quantity: i32) -> Result<(), StockError> {
        ensure_positive(quantity)?;
        if self.reserved < quantity {
            return Err(StockError::ReservedInconsistent {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        self.reserved -= quantity;
        self.available += quantity;
        Ok(())
    }

    /// Permanently consume reserved stock (sales order confirmation).
    /// `available` was already decremented when the reservation was made.
    pub fn consume_reserved(&mut self, quantity: i32) -> Result<(), StockError> {
        ensure_positive(quantity)?;
        if self.reserved < quantity {
            return Err(StockError::ReservedInconsistent {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        self.reserved -= quantity;
        Ok(())
    }

    /// Add inbound goods straight to available (purchase order receipt).
    pub fn receive(&mut self, quantity: i32) -> Result<(), StockError> {
        ensure_positive(quantity)?;
        self.available += quantity;
        Ok(())
    }

    /// Direct stock correction. Negative deltas are allowed only while the
    /// result stays >= 0.
    pub fn adjust(&mut self, delta: i32) -> Result<(), StockError> {
        if self.available + delta < 0 {
            return Err(StockError::AdjustBelowZero {
                available: self.available,
                delta,
            });
        }
        self.available += delta;
        Ok(())
    }
}

fn ensure_positive(quantity: i32) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::NonPositiveQuantity(quantity));
    }
    Ok(())
}
