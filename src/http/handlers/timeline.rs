use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn order_timeline(
    State(state): State<AppState>,
    Path(woo_order_id): Path<String>,
) -> impl IntoResponse {
    let Ok(order_id) = woo_order_id.parse::<i64>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid order ID"})),
        )
            .into_response();
    };

    match state.timeline.reconstruct(order_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, woo_order_id = order_id, "failed to get timeline");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to get timeline"})),
            )
                .into_response()
        }
    }
}
