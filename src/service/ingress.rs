use crate::domain::envelope::EventEnvelope;
use crate::idempotency::{IdempotencyStatus, IdempotencyStore};
use crate::metrics;
use crate::repo::event_log_repo::EventLogRepo;
use crate::repo::queue_repo::QueueRepo;
use anyhow::Result;
use uuid::Uuid;

#[derive(Debug)]
pub enum IngressOutcome {
    Queued { event_id: Uuid },
    Duplicate {
        idempotency_key: String,
        status: Option<IdempotencyStatus>,
    },
}

#[derive(Clone)]
pub struct IngressService {
    pub idempotency: IdempotencyStore,
    pub event_log_repo: EventLogRepo,
    pub queue_repo: QueueRepo,
    pub max_attempts: i32,
}

impl IngressService {
    /// Claims the envelope's idempotency key, writes the ledger row, and
    /// enqueues the job. Any store failure propagates to the caller as a
    /// 500 rather than bypassing the dedup check.
    pub async fn accept(&self, envelope: EventEnvelope) -> Result<IngressOutcome> {
        metrics::record_event_received(&envelope.source, &envelope.event_type);

        let claim = self.idempotency.claim(&envelope.idempotency_key).await?;
        if !claim.is_new {
            tracing::info!(
                idempotency_key = %envelope.idempotency_key,
                status = ?claim.existing_status,
                "duplicate event"
            );
            metrics::record_idempotency_hit(
                claim.existing_status.map_or("expired", |s| s.as_str()),
            );
            return Ok(IngressOutcome::Duplicate {
                idempotency_key: envelope.idempotency_key,
                status: claim.existing_status,
            });
        }

        self.event_log_repo.insert_received(&envelope).await?;

        let enqueued = self.queue_repo.enqueue(&envelope, self.max_attempts).await?;
        if !enqueued {
            // The key slipped past the idempotency store (e.g. an expired
            // record) but a queue row still exists for it. Still a dedup
            // hit, just caught by the second line of defense.
            tracing::warn!(
                idempotency_key = %envelope.idempotency_key,
                "queue row already present, dropping duplicate"
            );
            metrics::record_idempotency_hit("expired");
            return Ok(IngressOutcome::Duplicate {
                idempotency_key: envelope.idempotency_key,
                status: None,
            });
        }

        self.event_log_repo.mark_queued(&envelope.idempotency_key).await?;

        tracing::info!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            "event queued"
        );

        Ok(IngressOutcome::Queued {
            event_id: envelope.event_id,
        })
    }
}
