//! Idempotency guard for externally retried mutations
//!
//! Wraps a mutation with a composite key (actor, endpoint, client token).
//! The first execution stores its serialized result; repeats inside the
//! expiry window replay that result without running the mutation again, so
//! a network retry of an order creation cannot create a second order.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

use shared::models::Actor;
use shared::validation::normalize_idempotency_key;

use crate::config::IdempotencyConfig;
use crate::error::{is_unique_violation, AppError, AppResult};

/// Floor applied to configured TTLs so replay windows are never useless.
const MIN_TTL_SECONDS: i64 = 60;

/// Duplicate-suppression wrapper around engine mutations
#[derive(Clone)]
pub struct IdempotencyService {
    db: PgPool,
    enabled: bool,
    ttl_seconds: i64,
}

impl IdempotencyService {
    pub fn new(db: PgPool, config: &IdempotencyConfig) -> Self {
        Self {
            db,
            enabled: config.enabled,
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// Run `action` at most once per (actor, endpoint, token).
    ///
    /// Absent or disabled tokens run the action directly. When two
    /// concurrent requests race on the same new key, the loser's insert
    /// hits the unique constraint; it then re-reads and returns the
    /// winner's stored result instead of erroring.
    pub async fn execute<T, F, Fut>(
        &self,
        actor: &Actor,
        endpoint_key: &str,
        idempotency_key: Option<&str>,
        action: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if !self.enabled {
            return action().await;
        }
        let normalized = normalize_idempotency_key(idempotency_key)
            .map_err(|msg| AppError::BusinessRuleViolation(msg.to_string()))?;
        let Some(key) = normalized else {
            return action().await;
        };

        let now = Utc::now();
        if let Some((body, expires_at)) = self.lookup(actor, endpoint_key, &key).await? {
            if expires_at > now {
                tracing::debug!(endpoint_key, "replaying stored idempotent response");
                return Ok(serde_json::from_str(&body)?);
            }
            // The replay window elapsed; forget the stale result.
            self.delete(actor, endpoint_key, &key).await?;
        }

        let response = action().await?;
        let body = serde_json::to_string(&response)?;
        let expires_at = now + Duration::seconds(self.ttl_seconds.max(MIN_TTL_SECONDS));

        let inserted = sqlx::query(
            r#"
            INSERT INTO api_idempotency_keys (actor, endpoint_key, idempotency_key, response_body, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&actor.username)
        .bind(endpoint_key)
        .bind(&key)
        .bind(&body)
        .bind(expires_at)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(response),
            Err(err) if is_unique_violation(&err) => {
                let (body, _) = self
                    .lookup(actor, endpoint_key, &key)
                    .await?
                    .ok_or_else(|| {
                        AppError::InconsistentState(
                            "idempotency key missing after unique violation".to_string(),
                        )
                    })?;
                Ok(serde_json::from_str(&body)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drop all keys past their expiry. Invoked by an external scheduler.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM api_idempotency_keys WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn lookup(
        &self,
        actor: &Actor,
        endpoint_key: &str,
        idempotency_key: &str,
    ) -> AppResult<Option<(String, DateTime<Utc>)>> {
        let row = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            r#"
            SELECT response_body, expires_at
            FROM api_idempotency_keys
            WHERE actor = $1 AND endpoint_key = $2 AND idempotency_key = $3
            "#,
        )
        .bind(&actor.username)
        .bind(endpoint_key)
        .bind(idempotency_key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(
        &self,
        actor: &Actor,
        endpoint_key: &str,
        idempotency_key: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM api_idempotency_keys WHERE actor = $1 AND endpoint_key = $2 AND idempotency_key = $3",
        )
        .bind(&actor.username)
        .bind(endpoint_key)
        .bind(idempotency_key)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
