//! Egress polling: `GET /response/:user_id` waits for the next answer
//! published for that user.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use cb_bus::AwaitError;

use crate::state::AppState;

pub async fn await_response(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    let timeout = Duration::from_secs(state.config.bus.await_timeout_secs);

    match state.correlator.await_outbound(&user_id, timeout).await {
        Ok(response) => Json(serde_json::json!({
            "user_id": user_id,
            "response": response,
        }))
        .into_response(),
        Err(AwaitError::Timeout { .. }) => {
            tracing::debug!(user_id = %user_id, "no response within timeout");
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(serde_json::json!({ "error": "response timeout" })),
            )
                .into_response()
        }
        Err(e @ AwaitError::Bus(_)) => {
            tracing::warn!(user_id = %user_id, error = %e, "awaiting response failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
