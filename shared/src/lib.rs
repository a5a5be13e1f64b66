//! Shared types and domain rules for the Inventory Management System
//!
//! This crate contains the pure side of the platform: data models, order
//! state machines, stock arithmetic and replenishment math. It performs no
//! I/O, so every rule in here can be tested without a database.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
