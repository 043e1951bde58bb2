use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const SOURCE_WOO: &str = "woo";

#[derive(Debug)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub source: String,
    pub occurred_at: DateTime<Utc>,
    pub idempotency_key: String,
    pub trace_id: Uuid,
    pub data: Value,
}

impl EventEnvelope {
    /// Normalizes one raw webhook body into a canonical envelope. The body
    /// must carry a numeric `id`; everything else is optional and kept
    /// opaque until dispatch.
    pub fn from_webhook(topic: &str, body: Value, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let order_id = body
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ValidationError("body must contain a numeric id".to_string()))?;

        let timestamp_ms = body
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| now.timestamp_millis());

        Ok(Self {
            event_id: Uuid::new_v4(),
            event_type: format!("{SOURCE_WOO}.{topic}"),
            source: SOURCE_WOO.to_string(),
            occurred_at: now,
            idempotency_key: derive_idempotency_key(SOURCE_WOO, order_id, topic, timestamp_ms),
            trace_id: Uuid::new_v4(),
            data: body,
        })
    }
}

/// Deterministic dedup key for retried or re-delivered webhooks.
pub fn derive_idempotency_key(source: &str, order_id: i64, topic: &str, timestamp_ms: i64) -> String {
    format!("{source}:{order_id}:{topic}:{timestamp_ms}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Received,
    Queued,
    Processing,
    Succeeded,
    Failed,
    Dlq,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Dlq => "dlq",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingDetails {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address_1: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    pub id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub billing: Option<BillingDetails>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// Tagged view over the envelope's opaque payload. Upstream topics the
/// service has not been extended for parse to `Unknown` and are accepted
/// as a no-op instead of failing the job.
#[derive(Debug, Clone)]
pub enum EventKind {
    OrderCreated(OrderPayload),
    OrderPaid(OrderPayload),
    Unknown { event_type: String },
}

impl EventKind {
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, ValidationError> {
        match envelope.event_type.as_str() {
            "woo.order.created" => serde_json::from_value(envelope.data.clone())
                .map(Self::OrderCreated)
                .map_err(|e| ValidationError(format!("invalid order.created payload: {e}"))),
            "woo.order.paid" => serde_json::from_value(envelope.data.clone())
                .map(Self::OrderPaid)
                .map_err(|e| ValidationError(format!("invalid order.paid payload: {e}"))),
            other => Ok(Self::Unknown {
                event_type: other.to_string(),
            }),
        }
    }
}
