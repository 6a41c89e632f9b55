//! WhatsApp Cloud API webhook ingress.
//!
//! Only the fields the gateway reads are modelled; everything else in the
//! payload is ignored.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use cb_domain::envelope::InboundEnvelope;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMessage {
    /// Sender's WhatsApp id, used as the user id.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub text: Option<WebhookText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookText {
    #[serde(default)]
    pub body: String,
}

impl WebhookPayload {
    /// Every text message with a sender, in payload order.
    pub fn envelopes(&self) -> Vec<InboundEnvelope> {
        self.entry
            .iter()
            .flat_map(|e| &e.changes)
            .flat_map(|c| &c.value.messages)
            .filter_map(|m| {
                let text = m.text.as_ref()?;
                if m.from.is_empty() || text.body.is_empty() {
                    return None;
                }
                Some(InboundEnvelope {
                    user_id: m.from.clone(),
                    text: text.body.clone(),
                })
            })
            .collect()
    }
}

/// `POST /whatsapp/webhook`
///
/// Messages are published in payload order and publishing stops at the
/// first failure. The error body reports how many were already queued, so
/// a sender that retries the whole payload will deliver those again.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "invalid webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid payload",
                    "details": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    let envelopes = payload.envelopes();
    if envelopes.is_empty() {
        tracing::debug!("webhook carried no text messages");
    }

    for (queued, envelope) in envelopes.iter().enumerate() {
        tracing::info!(user_id = %envelope.user_id, "queueing inbound message");
        if let Err(e) = state.correlator.publish_inbound(envelope).await {
            tracing::error!(
                user_id = %envelope.user_id,
                queued,
                error = %e,
                "failed to queue message"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": "Failed to queue message",
                    "queued": queued,
                })),
            )
                .into_response();
        }
    }

    Json(serde_json::json!({
        "status": "ok",
        "message": "Message received and queued",
        "queued": envelopes.len(),
    }))
    .into_response()
}
