//! Best-effort history sink. Entries are written through the sqlx pool
//! strictly after the caller's transaction has committed; a failure here is
//! logged and never surfaced, so it can never roll back or block the
//! transactional path.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, models::AuditEntry};

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Convenience wrapper used after commit: warn on failure, never propagate.
pub async fn log_audit_best_effort(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) {
    if let Err(err) = log_audit(pool, user_id, action, resource, metadata).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}

/// History entries that reference an order, oldest first. May be empty.
pub async fn order_history(pool: &DbPool, order_id: Uuid) -> AppResult<Vec<AuditEntry>> {
    let entries = sqlx::query_as::<_, AuditEntry>(
        r#"
        SELECT id, user_id, action, resource, metadata, created_at
        FROM audit_logs
        WHERE metadata ->> 'order_id' = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(order_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
