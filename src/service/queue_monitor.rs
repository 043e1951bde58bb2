use crate::metrics::{self, QUEUE_NAME};
use crate::repo::queue_repo::QueueRepo;
use anyhow::Result;
use chrono::Utc;

/// Samples queue depth and oldest-job age on a fixed interval. Purely for
/// metrics; a failed sample is logged and never affects the pipeline.
#[derive(Clone)]
pub struct QueueMonitor {
    pub queue_repo: QueueRepo,
    pub interval: std::time::Duration,
}

impl QueueMonitor {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::warn!("queue metrics sampling failed: {}", err);
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        let depth = self.queue_repo.depth().await?;
        metrics::set_queue_depth(QUEUE_NAME, depth as f64);

        let age_seconds = match self.queue_repo.oldest_pending_enqueued_at().await? {
            Some(oldest) => ((Utc::now() - oldest).num_milliseconds() as f64 / 1000.0).max(0.0),
            None => 0.0,
        };
        metrics::set_oldest_job_age(QUEUE_NAME, age_seconds);

        Ok(())
    }
}
