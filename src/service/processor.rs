use crate::domain::envelope::EventEnvelope;
use crate::domain::sanitize::sanitize_payload;
use crate::idempotency::{IdempotencyStatus, IdempotencyStore};
use crate::metrics;
use crate::repo::dlq_repo::{DeadLetterEntry, DlqRepo, REASON_MAX_RETRIES};
use crate::repo::event_log_repo::EventLogRepo;
use crate::repo::queue_repo::{QueueRepo, QueuedJob};
use crate::service::dispatcher::EventDispatcher;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::time::Instant;

const BATCH_SIZE: i64 = 10;
const MAX_BACKOFF_MS: i64 = 300_000;

/// What one attempt resolved to, reported back to the queue layer. Retry
/// policy lives here instead of being driven by raised errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed,
    Retry { attempts: i32 },
    DeadLetter { attempts: i32 },
}

/// Decides the fate of a failed attempt. `attempts_before` is the count of
/// attempts already consumed; the budget is exhausted when the attempt that
/// just failed was the last one.
pub fn classify_failure(attempts_before: i32, max_attempts: i32) -> AttemptOutcome {
    let attempts = attempts_before + 1;
    if attempts >= max_attempts.max(1) {
        AttemptOutcome::DeadLetter { attempts }
    } else {
        AttemptOutcome::Retry { attempts }
    }
}

/// Exponential backoff: base delay doubling per attempt, capped at 5 minutes.
pub fn backoff_delay_ms(base_ms: i64, attempt: i32) -> i64 {
    let exp = (attempt - 1).clamp(0, 20) as u32;
    i64::min(MAX_BACKOFF_MS, base_ms.saturating_mul(1_i64 << exp))
}

#[derive(Clone)]
pub struct Processor {
    pub queue_repo: QueueRepo,
    pub event_log_repo: EventLogRepo,
    pub dlq_repo: DlqRepo,
    pub idempotency: IdempotencyStore,
    pub dispatcher: EventDispatcher,
    pub backoff_base_ms: i64,
    pub handler_timeout: std::time::Duration,
}

impl Processor {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("processor tick error: {}", err);
            }
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        let batch = self.queue_repo.lock_due(BATCH_SIZE).await?;
        for job in batch {
            // One job's infrastructure failure must not strand the rest of
            // the locked batch; the job stays RUNNING and comes back after
            // its visibility timeout expires.
            let outcome = match self.run_attempt(&job).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(job_id = job.id, "attempt aborted: {}", err);
                    continue;
                }
            };
            if let Err(err) = self.settle(&job, outcome).await {
                tracing::error!(job_id = job.id, "failed to settle job: {}", err);
            }
        }
        Ok(())
    }

    /// Runs one attempt to completion: ledger transitions, idempotency
    /// terminal status, dead-letter capture. Returns the outcome for the
    /// queue layer; only infrastructure failures propagate as errors.
    async fn run_attempt(&self, job: &QueuedJob) -> Result<AttemptOutcome> {
        tracing::info!(event_type = %job.event_type, job_id = job.id, "processing event");

        self.event_log_repo.mark_processing(&job.idempotency_key).await?;

        let start = Instant::now();
        let result = self.execute(job).await;
        let latency_ms = start.elapsed().as_millis() as i64;
        metrics::record_processing_duration(&job.event_type, latency_ms as f64);

        match result {
            Ok(()) => {
                self.event_log_repo
                    .mark_succeeded(&job.idempotency_key, latency_ms)
                    .await?;
                self.idempotency
                    .set_terminal_status(&job.idempotency_key, IdempotencyStatus::Succeeded)
                    .await?;
                metrics::record_event_processed("succeeded", &job.event_type);
                Ok(AttemptOutcome::Completed)
            }
            Err(err) => {
                let message = err.to_string();
                let detail = format!("{err:?}");
                tracing::error!(error = %message, event_type = %job.event_type, "processing failed");

                self.event_log_repo
                    .mark_failed(&job.idempotency_key, latency_ms, &message, &detail)
                    .await?;

                let outcome = classify_failure(job.attempts, job.max_attempts);
                match &outcome {
                    AttemptOutcome::Retry { .. } => {
                        metrics::record_retry(&job.event_type);
                        metrics::record_event_processed("retry", &job.event_type);
                    }
                    AttemptOutcome::DeadLetter { attempts } => {
                        self.dlq_repo
                            .record(&DeadLetterEntry {
                                event_type: job.event_type.clone(),
                                idempotency_key: job.idempotency_key.clone(),
                                original_payload: sanitize_payload(&job.payload),
                                last_error: message,
                                last_error_detail: detail,
                                retry_count: *attempts,
                                reason: REASON_MAX_RETRIES.to_string(),
                            })
                            .await?;
                        self.event_log_repo
                            .mark_dead_lettered(&job.idempotency_key)
                            .await?;
                        metrics::record_dlq(&job.event_type, REASON_MAX_RETRIES);
                        metrics::record_event_processed("dlq", &job.event_type);
                    }
                    AttemptOutcome::Completed => {}
                }

                // Failed either way: a duplicate webhook arriving while
                // retries are pending reports "already being handled"
                // instead of re-queuing.
                self.idempotency
                    .set_terminal_status(&job.idempotency_key, IdempotencyStatus::Failed)
                    .await?;

                Ok(outcome)
            }
        }
    }

    async fn settle(&self, job: &QueuedJob, outcome: AttemptOutcome) -> Result<()> {
        match outcome {
            AttemptOutcome::Completed => self.queue_repo.mark_done(job.id).await,
            AttemptOutcome::Retry { attempts } => {
                let delay = backoff_delay_ms(self.backoff_base_ms, attempts);
                let next_attempt_at = Utc::now() + chrono::Duration::milliseconds(delay);
                self.queue_repo.mark_retry(job.id, attempts, next_attempt_at).await
            }
            AttemptOutcome::DeadLetter { attempts } => self.queue_repo.mark_dead(job.id, attempts).await,
        }
    }

    async fn execute(&self, job: &QueuedJob) -> Result<()> {
        let envelope: EventEnvelope = serde_json::from_value(job.payload.clone())
            .map_err(|e| anyhow!("corrupt queue payload: {e}"))?;

        tokio::time::timeout(self.handler_timeout, self.dispatcher.dispatch(&envelope))
            .await
            .map_err(|_| anyhow!("handler timed out after {:?}", self.handler_timeout))?
    }
}
