use anyhow::Result;
use sqlx::PgPool;

pub const REASON_MAX_RETRIES: &str = "max_retries_exceeded";

#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub event_type: String,
    pub idempotency_key: String,
    /// Must already be sanitized by the caller.
    pub original_payload: serde_json::Value,
    pub last_error: String,
    pub last_error_detail: String,
    pub retry_count: i32,
    pub reason: String,
}

#[derive(Clone)]
pub struct DlqRepo {
    pub pool: PgPool,
}

impl DlqRepo {
    /// Append-only; entries are retained indefinitely for manual triage.
    pub async fn record(&self, entry: &DeadLetterEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dlq (event_type, idempotency_key, original_payload, last_error, last_error_stack, retry_count, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entry.event_type)
        .bind(&entry.idempotency_key)
        .bind(&entry.original_payload)
        .bind(&entry.last_error)
        .bind(&entry.last_error_detail)
        .bind(entry.retry_count)
        .bind(&entry.reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
