use crate::domain::envelope::EventEnvelope;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: i64,
    pub idempotency_key: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub max_attempts: i32,
}

/// How long a RUNNING row may sit untouched before it is considered
/// abandoned by a dead or stalled worker and handed out again.
const VISIBILITY_TIMEOUT_SECS: f64 = 300.0;

#[derive(Clone)]
pub struct QueueRepo {
    pub pool: PgPool,
}

impl QueueRepo {
    /// Enqueues an envelope keyed by its idempotency_key. The unique key is
    /// a second line of dedup defense behind the idempotency store; a
    /// conflicting insert is dropped and reported as `false`.
    pub async fn enqueue(&self, envelope: &EventEnvelope, max_attempts: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_queue (idempotency_key, event_type, payload, status, attempts, max_attempts, next_attempt_at)
            VALUES ($1, $2, $3, 'PENDING', 0, $4, now())
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(&envelope.idempotency_key)
        .bind(&envelope.event_type)
        .bind(serde_json::to_value(envelope)?)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Claims a batch of due jobs. `FOR UPDATE SKIP LOCKED` keeps workers
    /// from double-claiming and guarantees at most one in-flight attempt
    /// per key. RUNNING rows whose lease expired are reclaimed here too,
    /// so a worker dying mid-attempt delays a job instead of losing it.
    pub async fn lock_due(&self, batch_size: i64) -> Result<Vec<QueuedJob>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, idempotency_key, event_type, payload, attempts, max_attempts
            FROM event_queue
            WHERE (status = 'PENDING' AND next_attempt_at <= now())
               OR (status = 'RUNNING' AND updated_at <= now() - make_interval(secs => $2))
            ORDER BY id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(batch_size)
        .bind(VISIBILITY_TIMEOUT_SECS)
        .fetch_all(tx.as_mut())
        .await?;

        if rows.is_empty() {
            tx.rollback().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
        sqlx::query("UPDATE event_queue SET status = 'RUNNING', updated_at = now() WHERE id = ANY($1)")
            .bind(&ids)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(rows
            .into_iter()
            .map(|r| QueuedJob {
                id: r.get("id"),
                idempotency_key: r.get("idempotency_key"),
                event_type: r.get("event_type"),
                payload: r.get("payload"),
                attempts: r.get("attempts"),
                max_attempts: r.get("max_attempts"),
            })
            .collect())
    }

    pub async fn mark_done(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE event_queue SET status='DONE', updated_at=now() WHERE id=$1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_retry(&self, id: i64, attempts: i32, next_attempt_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE event_queue SET status='PENDING', attempts=$2, next_attempt_at=$3, updated_at=now() WHERE id=$1",
        )
        .bind(id)
        .bind(attempts)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_dead(&self, id: i64, attempts: i32) -> Result<()> {
        sqlx::query("UPDATE event_queue SET status='DEAD', attempts=$2, updated_at=now() WHERE id=$1")
            .bind(id)
            .bind(attempts)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn depth(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM event_queue WHERE status IN ('PENDING', 'RUNNING')")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn oldest_pending_enqueued_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MIN(enqueued_at) AS oldest FROM event_queue WHERE status = 'PENDING'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("oldest"))
    }
}
