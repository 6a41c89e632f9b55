pub mod health;
pub mod response;
pub mod whatsapp;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router: webhook ingress, response polling, health probe.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/whatsapp/webhook", post(whatsapp::receive))
        .route("/response/:user_id", get(response::await_response))
        .route("/health", get(health::health))
}
