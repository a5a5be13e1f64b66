//! Inventory Management System - Order Engine
//!
//! Transactional core for product stock, sales orders and purchase orders:
//! per-product row locking around every stock mutation, all-or-nothing
//! order transitions, replenishment suggestions and idempotent retries.
//! Transport, identity and scheduling live outside this crate; callers
//! hand every operation a resolved [`shared::models::Actor`].

use std::sync::Arc;

use sqlx::PgPool;

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use engine::Engine;

/// Application state shared by the engine services
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect the pool, run migrations in development, and bundle the
    /// configuration for service construction.
    pub async fn initialize(config: Config) -> anyhow::Result<Self> {
        let db = db::connect(&config.database).await?;

        if config.environment == "development" {
            tracing::info!("Running database migrations...");
            db::run_migrations(&db).await?;
            tracing::info!("Migrations completed");
        }

        Ok(Self {
            db,
            config: Arc::new(config),
        })
    }

    /// Assemble the operation surface on top of this state.
    pub fn engine(&self) -> Engine {
        Engine::new(self.db.clone(), &self.config)
    }
}
