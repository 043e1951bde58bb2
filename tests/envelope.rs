use chrono::{TimeZone, Utc};
use integration_service::domain::envelope::{derive_idempotency_key, EventEnvelope, EventKind, EventStatus};
use serde_json::json;

#[test]
fn idempotency_key_is_deterministic() {
    let a = derive_idempotency_key("woo", 42, "order.created", 1717243200000);
    let b = derive_idempotency_key("woo", 42, "order.created", 1717243200000);
    assert_eq!(a, b);
    assert_eq!(a, "woo:42:order.created:1717243200000");
}

#[test]
fn envelope_uses_body_timestamp_when_present() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let envelope =
        EventEnvelope::from_webhook("order.created", json!({"id": 42, "timestamp": 1111}), now).unwrap();

    assert_eq!(envelope.event_type, "woo.order.created");
    assert_eq!(envelope.source, "woo");
    assert_eq!(envelope.idempotency_key, "woo:42:order.created:1111");
}

#[test]
fn envelope_falls_back_to_receive_time() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let envelope = EventEnvelope::from_webhook("order.paid", json!({"id": 7}), now).unwrap();

    let expected = derive_idempotency_key("woo", 7, "order.paid", now.timestamp_millis());
    assert_eq!(envelope.idempotency_key, expected);
}

#[test]
fn body_without_numeric_id_is_rejected() {
    let now = Utc::now();
    assert!(EventEnvelope::from_webhook("order.created", json!({"status": "pending"}), now).is_err());
    assert!(EventEnvelope::from_webhook("order.created", json!({"id": "forty-two"}), now).is_err());
}

#[test]
fn known_topics_parse_to_typed_payloads() {
    let now = Utc::now();
    let body = json!({
        "id": 42,
        "status": "pending",
        "billing": {"email": "a@b.com"},
        "line_items": [{"product_id": 5, "name": "Widget", "quantity": 2.0, "price": 9.5}]
    });

    let envelope = EventEnvelope::from_webhook("order.created", body, now).unwrap();
    match EventKind::from_envelope(&envelope).unwrap() {
        EventKind::OrderCreated(order) => {
            assert_eq!(order.id, 42);
            assert_eq!(order.status, "pending");
            assert_eq!(order.line_items.len(), 1);
            assert_eq!(order.billing.unwrap().email.as_deref(), Some("a@b.com"));
        }
        other => panic!("expected OrderCreated, got {other:?}"),
    }

    let envelope = EventEnvelope::from_webhook("order.paid", json!({"id": 42, "status": "paid"}), now).unwrap();
    assert!(matches!(
        EventKind::from_envelope(&envelope).unwrap(),
        EventKind::OrderPaid(_)
    ));
}

#[test]
fn unrecognized_topic_is_accepted_as_unknown() {
    let now = Utc::now();
    let envelope = EventEnvelope::from_webhook("order.refunded", json!({"id": 42}), now).unwrap();

    match EventKind::from_envelope(&envelope).unwrap() {
        EventKind::Unknown { event_type } => assert_eq!(event_type, "woo.order.refunded"),
        other => panic!("expected Unknown, got {other:?}"),
    }
}

#[test]
fn envelope_round_trips_through_json() {
    let now = Utc::now();
    let envelope = EventEnvelope::from_webhook("order.created", json!({"id": 1}), now).unwrap();

    let value = serde_json::to_value(&envelope).unwrap();
    let back: EventEnvelope = serde_json::from_value(value).unwrap();
    assert_eq!(back.idempotency_key, envelope.idempotency_key);
    assert_eq!(back.event_id, envelope.event_id);
}

#[test]
fn status_labels_match_ledger_values() {
    assert_eq!(EventStatus::Queued.as_str(), "queued");
    assert_eq!(EventStatus::Dlq.as_str(), "dlq");
}
