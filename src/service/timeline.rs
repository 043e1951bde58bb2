use crate::domain::sanitize::sanitize_payload;
use crate::repo::event_log_repo::{EventLogEntry, EventLogRepo};
use crate::repo::order_map_repo::{OrderMapRepo, OrderMapStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageDuration {
    pub status: String,
    pub duration_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct TimelineEventView {
    pub id: Uuid,
    pub event_type: String,
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub latency_ms: Option<i64>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CurrentStatus {
    pub woo: Option<String>,
    pub odoo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimelineView {
    pub woo_order_id: i64,
    pub odoo_order_id: Option<i64>,
    pub current_status: CurrentStatus,
    pub timeline: Vec<TimelineEventView>,
    pub stage_durations_ms: Vec<StageDuration>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Deltas between consecutive ledger entries in received order, keyed by
/// the later entry's status. N entries yield exactly N-1 durations.
pub fn compute_stage_durations(entries: &[EventLogEntry]) -> Vec<StageDuration> {
    entries
        .windows(2)
        .map(|pair| StageDuration {
            status: pair[1].status.clone(),
            duration_ms: (pair[1].received_at - pair[0].received_at).num_milliseconds(),
        })
        .collect()
}

/// Read-only diagnostic view; joins the ledger with the order map and never
/// writes anything.
#[derive(Clone)]
pub struct TimelineService {
    pub event_log_repo: EventLogRepo,
    pub order_map_repo: OrderMapRepo,
}

impl TimelineService {
    pub async fn reconstruct(&self, woo_order_id: i64) -> Result<TimelineView> {
        let entries = self.event_log_repo.list_for_order(woo_order_id).await?;
        let order_map = self.order_map_repo.find(woo_order_id).await?;

        let stage_durations_ms = compute_stage_durations(&entries);
        let timeline = entries
            .into_iter()
            .map(|e| TimelineEventView {
                id: e.id,
                event_type: e.event_type,
                status: e.status,
                received_at: e.received_at,
                latency_ms: e.latency_ms,
                error_message: e.error_message,
                metadata: e.metadata,
                payload: sanitize_payload(&e.payload),
            })
            .collect();

        Ok(TimelineView {
            woo_order_id,
            odoo_order_id: order_map.as_ref().and_then(|m| m.odoo_sale_order_id),
            current_status: CurrentStatus {
                woo: order_map.as_ref().and_then(|m| m.woo_status.clone()),
                odoo: order_map.as_ref().and_then(|m| m.odoo_status.clone()),
            },
            timeline,
            stage_durations_ms,
            last_sync_at: order_map.and_then(|m| m.last_sync_at),
        })
    }
}
