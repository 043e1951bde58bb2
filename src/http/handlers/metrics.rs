use crate::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

pub async fn render(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics_handle.render(),
    )
}
