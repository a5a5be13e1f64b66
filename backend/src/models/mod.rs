//! Database models for the Inventory Management System
//!
//! Re-exports the domain models from the shared crate; query-shaped row
//! structs live next to the services that read them.

pub use shared::models::*;
