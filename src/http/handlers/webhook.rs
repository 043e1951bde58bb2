use crate::domain::envelope::EventEnvelope;
use crate::service::ingress::IngressOutcome;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of the raw request body under the shared secret.
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time signature check.
pub fn verify_signature(secret: &str, body: &[u8], provided_hex: &str) -> bool {
    use subtle::ConstantTimeEq;
    let expected = compute_signature(secret, body);
    expected.as_bytes().ct_eq(provided_hex.as_bytes()).into()
}

pub async fn woo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // No configured secret disables verification (dev mode).
    if !state.webhook_secret.is_empty() {
        let Some(signature) = headers
            .get("x-woo-webhook-signature")
            .and_then(|h| h.to_str().ok())
        else {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Missing webhook signature"})),
            )
                .into_response();
        };

        if !verify_signature(&state.webhook_secret, &body, signature) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid webhook signature"})),
            )
                .into_response();
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid event format"})),
            )
                .into_response()
        }
    };

    let topic = headers
        .get("x-woo-webhook-topic")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("order.created");

    tracing::info!(topic, order_id = ?payload.get("id"), "received woo webhook");

    let envelope = match EventEnvelope::from_webhook(topic, payload, Utc::now()) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::error!(error = %err, "invalid event format");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid event format"})),
            )
                .into_response();
        }
    };

    match state.ingress.accept(envelope).await {
        Ok(IngressOutcome::Queued { event_id }) => (
            StatusCode::ACCEPTED,
            Json(json!({"status": "queued", "event_id": event_id})),
        )
            .into_response(),
        Ok(IngressOutcome::Duplicate { idempotency_key, .. }) => (
            StatusCode::OK,
            Json(json!({"status": "already_processed", "idempotency_key": idempotency_key})),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("failed to queue event: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to queue event"})),
            )
                .into_response()
        }
    }
}
