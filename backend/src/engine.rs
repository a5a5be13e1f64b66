//! Transport-agnostic operation surface
//!
//! Bundles the engine services behind the operations an embedding layer
//! (HTTP, queue consumer, CLI) actually calls. Every mutating operation
//! takes an optional client-supplied idempotency token and returns the
//! full updated aggregate; retries with the same token replay the stored
//! result instead of executing twice.

use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{
    Actor, ProductWithStock, PurchaseOrderDetail, ReceiptRequestLine, ReplenishmentSuggestion,
    SalesOrderDetail,
};

use crate::config::Config;
use crate::error::AppResult;
use crate::services::product::AdjustStockInput;
use crate::services::purchase_order::CreatePurchaseOrderInput;
use crate::services::sales_order::CreateSalesOrderInput;
use crate::services::{
    AuditLogService, IdempotencyService, ProductService, PurchaseOrderService,
    ReplenishmentService, SalesOrderService,
};

/// The assembled order engine
#[derive(Clone)]
pub struct Engine {
    products: ProductService,
    sales_orders: SalesOrderService,
    purchase_orders: PurchaseOrderService,
    replenishment: ReplenishmentService,
    idempotency: IdempotencyService,
}

impl Engine {
    pub fn new(db: PgPool, config: &Config) -> Self {
        let audit = AuditLogService::new(db.clone());
        Self {
            products: ProductService::new(db.clone(), audit.clone()),
            sales_orders: SalesOrderService::new(db.clone(), audit.clone()),
            purchase_orders: PurchaseOrderService::new(db.clone(), audit),
            replenishment: ReplenishmentService::new(db.clone()),
            idempotency: IdempotencyService::new(db, &config.idempotency),
        }
    }

    pub async fn create_sales_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        input: CreateSalesOrderInput,
    ) -> AppResult<SalesOrderDetail> {
        self.idempotency
            .execute(actor, "sales-orders.create", idempotency_key, || {
                self.sales_orders.create_order(actor, input)
            })
            .await
    }

    pub async fn confirm_sales_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let endpoint_key = format!("sales-orders.{}.confirm", order_id);
        self.idempotency
            .execute(actor, &endpoint_key, idempotency_key, || {
                self.sales_orders.confirm_order(actor, order_id)
            })
            .await
    }

    pub async fn cancel_sales_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        order_id: Uuid,
    ) -> AppResult<SalesOrderDetail> {
        let endpoint_key = format!("sales-orders.{}.cancel", order_id);
        self.idempotency
            .execute(actor, &endpoint_key, idempotency_key, || {
                self.sales_orders.cancel_order(actor, order_id)
            })
            .await
    }

    pub async fn create_purchase_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        self.idempotency
            .execute(actor, "purchase-orders.create", idempotency_key, || {
                self.purchase_orders.create_order(actor, input)
            })
            .await
    }

    pub async fn receive_purchase_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        order_id: Uuid,
        items: Option<Vec<ReceiptRequestLine>>,
    ) -> AppResult<PurchaseOrderDetail> {
        let endpoint_key = format!("purchase-orders.{}.receive", order_id);
        self.idempotency
            .execute(actor, &endpoint_key, idempotency_key, || {
                self.purchase_orders.receive_order(actor, order_id, items)
            })
            .await
    }

    pub async fn cancel_purchase_order(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        order_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        let endpoint_key = format!("purchase-orders.{}.cancel", order_id);
        self.idempotency
            .execute(actor, &endpoint_key, idempotency_key, || {
                self.purchase_orders.cancel_order(actor, order_id)
            })
            .await
    }

    pub async fn adjust_stock(
        &self,
        actor: &Actor,
        idempotency_key: Option<&str>,
        product_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<ProductWithStock> {
        let endpoint_key = format!("products.{}.adjust-stock", product_id);
        self.idempotency
            .execute(actor, &endpoint_key, idempotency_key, || {
                self.products.adjust_stock(actor, product_id, input)
            })
            .await
    }

    pub async fn list_replenishment_suggestions(
        &self,
    ) -> AppResult<Vec<ReplenishmentSuggestion>> {
        self.replenishment.list_suggestions().await
    }
}
