//! Engine services for the Inventory Management System

pub mod audit;
pub mod idempotency;
pub mod product;
pub mod purchase_order;
pub mod replenishment;
pub mod sales_order;
pub mod stock;
pub mod supplier;
pub mod supplier_contract;

pub use audit::AuditLogService;
pub use idempotency::IdempotencyService;
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use replenishment::ReplenishmentService;
pub use sales_order::SalesOrderService;
pub use supplier::SupplierService;
pub use supplier_contract::SupplierContractService;
