//! Audit trail sink
//!
//! The engines append one record per completed transition. Writes are
//! best-effort: an audit outage must never roll back or block a business
//! mutation, so failures are logged and swallowed here.

use sqlx::PgPool;

use shared::models::Actor;

/// Append-only audit feed
#[derive(Clone)]
pub struct AuditLogService {
    db: PgPool,
}

impl AuditLogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record one audit event. Never fails from the caller's perspective.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        target_type: &str,
        target_id: &str,
        detail: &str,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (actor, actor_role, action, target_type, target_id, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&actor.username)
        .bind(actor.role.as_str())
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(detail)
        .execute(&self.db)
        .await;

        if let Err(err) = result {
            tracing::warn!(action, target_type, target_id, error = %err, "failed to write audit record");
        }
    }
}
