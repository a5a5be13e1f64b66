//! Supplier registry service
//!
//! Suppliers are soft-switched with an `active` flag rather than deleted;
//! inactive suppliers are rejected on purchase order creation and on
//! contract upsert, but their history stays intact.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::{Actor, Supplier};
use shared::validation::{normalize_optional_text, validate_required_text};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditLogService;

/// Supplier registry
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
    audit: AuditLogService,
}

/// Input for registering a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub code: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSupplierInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub active: Option<bool>,
}

impl SupplierService {
    pub fn new(db: PgPool, audit: AuditLogService) -> Self {
        Self { db, audit }
    }

    pub async fn create_supplier(
        &self,
        actor: &Actor,
        input: CreateSupplierInput,
    ) -> AppResult<Supplier> {
        validate_required_text(&input.code).map_err(|msg| AppError::validation("code", msg))?;
        validate_required_text(&input.name).map_err(|msg| AppError::validation("name", msg))?;
        let code = input.code.trim().to_string();
        let name = input.name.trim().to_string();

        let duplicate =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM suppliers WHERE code = $1)")
                .bind(&code)
                .fetch_one(&self.db)
                .await?;
        if duplicate {
            return Err(AppError::BusinessRuleViolation(format!(
                "Supplier code already exists: {}",
                code
            )));
        }

        let supplier = sqlx::query_as::<_, SupplierRow>(
            r#"
            INSERT INTO suppliers (code, name, contact_name, email, phone, note, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING id, code, name, contact_name, email, phone, note, active, created_at, updated_at
            "#,
        )
        .bind(&code)
        .bind(&name)
        .bind(normalize_optional_text(input.contact_name))
        .bind(normalize_optional_text(input.email))
        .bind(normalize_optional_text(input.phone))
        .bind(normalize_optional_text(input.note))
        .fetch_one(&self.db)
        .await
        .map(row_into_supplier)?;

        self.audit
            .record(
                actor,
                "SUPPLIER_CREATE",
                "SUPPLIER",
                &supplier.id.to_string(),
                &format!("code={}, name={}", supplier.code, supplier.name),
            )
            .await;

        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        actor: &Actor,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get_supplier(supplier_id).await?;

        let code = match normalize_optional_text(input.code) {
            Some(code) => code,
            None => existing.code,
        };
        let name = match normalize_optional_text(input.name) {
            Some(name) => name,
            None => existing.name,
        };

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE code = $1 AND id <> $2)",
        )
        .bind(&code)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(AppError::BusinessRuleViolation(format!(
                "Supplier code already exists: {}",
                code
            )));
        }

        let contact_name = normalize_optional_text(input.contact_name).or(existing.contact_name);
        let email = normalize_optional_text(input.email).or(existing.email);
        let phone = normalize_optional_text(input.phone).or(existing.phone);
        let note = normalize_optional_text(input.note).or(existing.note);
        let active = input.active.unwrap_or(existing.active);

        let supplier = sqlx::query_as::<_, SupplierRow>(
            r#"
            UPDATE suppliers
            SET code = $1, name = $2, contact_name = $3, email = $4, phone = $5, note = $6,
                active = $7, updated_at = NOW()
            WHERE id = $8
            RETURNING id, code, name, contact_name, email, phone, note, active, created_at, updated_at
            "#,
        )
        .bind(&code)
        .bind(&name)
        .bind(&contact_name)
        .bind(&email)
        .bind(&phone)
        .bind(&note)
        .bind(active)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await
        .map(row_into_supplier)?;

        self.audit
            .record(
                actor,
                "SUPPLIER_UPDATE",
                "SUPPLIER",
                &supplier_id.to_string(),
                &format!("code={}, name={}, active={}", code, name, active),
            )
            .await;

        Ok(supplier)
    }

    pub async fn activate_supplier(&self, actor: &Actor, supplier_id: Uuid) -> AppResult<Supplier> {
        self.set_active(actor, supplier_id, true, "SUPPLIER_ACTIVATE")
            .await
    }

    pub async fn deactivate_supplier(
        &self,
        actor: &Actor,
        supplier_id: Uuid,
    ) -> AppResult<Supplier> {
        self.set_active(actor, supplier_id, false, "SUPPLIER_DEACTIVATE")
            .await
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        let row = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, code, name, contact_name, email, phone, note, active, created_at, updated_at
            FROM suppliers
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Supplier not found: {}", supplier_id)))?;

        Ok(row_into_supplier(row))
    }

    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            r#"
            SELECT id, code, name, contact_name, email, phone, note, active, created_at, updated_at
            FROM suppliers
            ORDER BY active DESC, name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(row_into_supplier).collect())
    }

    async fn set_active(
        &self,
        actor: &Actor,
        supplier_id: Uuid,
        active: bool,
        action: &str,
    ) -> AppResult<Supplier> {
        let updated =
            sqlx::query("UPDATE suppliers SET active = $1, updated_at = NOW() WHERE id = $2")
                .bind(active)
                .bind(supplier_id)
                .execute(&self.db)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Supplier not found: {}",
                supplier_id
            )));
        }

        let supplier = self.get_supplier(supplier_id).await?;
        self.audit
            .record(
                actor,
                action,
                "SUPPLIER",
                &supplier_id.to_string(),
                &format!("code={}", supplier.code),
            )
            .await;
        Ok(supplier)
    }
}

type SupplierRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_into_supplier(row: SupplierRow) -> Supplier {
    Supplier {
        id: row.0,
        code: row.1,
        name: row.2,
        contact_name: row.3,
        email: row.4,
        phone: row.5,
        note: row.6,
        active: row.7,
        created_at: row.8,
        updated_at: row.9,
    }
}
