use crate::domain::envelope::{EventEnvelope, EventStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventLogEntry {
    pub id: Uuid,
    pub event_type: String,
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
    pub payload: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct EventLogRepo {
    pub pool: PgPool,
}

impl EventLogRepo {
    /// One ledger row per idempotency_key, born `received` before the job
    /// is handed to the queue. A conflicting insert is a duplicate delivery
    /// and leaves the existing lineage untouched.
    pub async fn insert_received(&self, envelope: &EventEnvelope) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_log (event_type, source, idempotency_key, trace_id, payload, status, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(&envelope.event_type)
        .bind(&envelope.source)
        .bind(&envelope.idempotency_key)
        .bind(envelope.trace_id.to_string())
        .bind(serde_json::to_value(envelope)?)
        .bind(EventStatus::Received.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Advances a freshly received row once its queue insert went through.
    /// The status guard keeps a late caller from regressing a row that has
    /// already moved on.
    pub async fn mark_queued(&self, idempotency_key: &str) -> Result<()> {
        sqlx::query("UPDATE event_log SET status=$2, queued_at=now() WHERE idempotency_key=$1 AND status=$3")
            .bind(idempotency_key)
            .bind(EventStatus::Queued.as_str())
            .bind(EventStatus::Received.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_processing(&self, idempotency_key: &str) -> Result<()> {
        sqlx::query("UPDATE event_log SET status=$2, processing_at=now() WHERE idempotency_key=$1")
            .bind(idempotency_key)
            .bind(EventStatus::Processing.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_succeeded(&self, idempotency_key: &str, latency_ms: i64) -> Result<()> {
        sqlx::query(
            "UPDATE event_log SET status=$3, completed_at=now(), latency_ms=$2 WHERE idempotency_key=$1",
        )
        .bind(idempotency_key)
        .bind(latency_ms)
        .bind(EventStatus::Succeeded.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        &self,
        idempotency_key: &str,
        latency_ms: i64,
        error_message: &str,
        error_detail: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_log
            SET status=$5, failed_at=now(), latency_ms=$2, error_message=$3, error_stack=$4
            WHERE idempotency_key=$1
            "#,
        )
        .bind(idempotency_key)
        .bind(latency_ms)
        .bind(error_message)
        .bind(error_detail)
        .bind(EventStatus::Failed.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_dead_lettered(&self, idempotency_key: &str) -> Result<()> {
        sqlx::query("UPDATE event_log SET status=$2 WHERE idempotency_key=$1")
            .bind(idempotency_key)
            .bind(EventStatus::Dlq.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All ledger entries whose envelope payload references the given order,
    /// oldest first. Matches on the order id inside the envelope's `data`
    /// object rather than a substring scan.
    pub async fn list_for_order(&self, woo_order_id: i64) -> Result<Vec<EventLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, status, received_at, latency_ms, error_message, payload, metadata
            FROM event_log
            WHERE payload -> 'data' ->> 'id' = $1
            ORDER BY received_at ASC
            "#,
        )
        .bind(woo_order_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| EventLogEntry {
                id: r.get("id"),
                event_type: r.get("event_type"),
                status: r.get("status"),
                received_at: r.get("received_at"),
                latency_ms: r.get("latency_ms"),
                error_message: r.get("error_message"),
                payload: r.get("payload"),
                metadata: r.get("metadata"),
            })
            .collect())
    }
}
