use chrono::{Duration, TimeZone, Utc};
use integration_service::repo::event_log_repo::EventLogEntry;
use integration_service::service::timeline::compute_stage_durations;
use uuid::Uuid;

fn entry(status: &str, offset_ms: i64) -> EventLogEntry {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    EventLogEntry {
        id: Uuid::new_v4(),
        event_type: "woo.order.created".to_string(),
        status: status.to_string(),
        received_at: base + Duration::milliseconds(offset_ms),
        latency_ms: None,
        error_message: None,
        payload: serde_json::json!({"data": {"id": 42}}),
        metadata: None,
    }
}

#[test]
fn n_entries_produce_n_minus_one_durations() {
    let entries = vec![
        entry("queued", 0),
        entry("processing", 150),
        entry("succeeded", 400),
        entry("succeeded", 900),
    ];

    let stages = compute_stage_durations(&entries);
    assert_eq!(stages.len(), entries.len() - 1);
}

#[test]
fn durations_are_keyed_by_later_status_and_sum_to_span() {
    let entries = vec![entry("queued", 0), entry("processing", 250), entry("succeeded", 1000)];

    let stages = compute_stage_durations(&entries);
    assert_eq!(stages[0].status, "processing");
    assert_eq!(stages[0].duration_ms, 250);
    assert_eq!(stages[1].status, "succeeded");
    assert_eq!(stages[1].duration_ms, 750);

    let total: i64 = stages.iter().map(|s| s.duration_ms).sum();
    assert_eq!(total, 1000);
    assert!(stages.iter().all(|s| s.duration_ms >= 0));
}

#[test]
fn repeated_status_labels_are_not_collapsed() {
    let entries = vec![
        entry("queued", 0),
        entry("failed", 100),
        entry("failed", 300),
        entry("failed", 700),
    ];

    let stages = compute_stage_durations(&entries);
    assert_eq!(stages.len(), 3);
    assert!(stages.iter().all(|s| s.status == "failed"));
    let total: i64 = stages.iter().map(|s| s.duration_ms).sum();
    assert_eq!(total, 700);
}

#[test]
fn single_entry_has_no_stages() {
    let stages = compute_stage_durations(&[entry("queued", 0)]);
    assert!(stages.is_empty());
}

#[test]
fn empty_timeline_has_no_stages() {
    let stages = compute_stage_durations(&[]);
    assert!(stages.is_empty());
}
