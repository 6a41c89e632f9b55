//! Per-user request/response correlation over the message bus.
//!
//! Requests from every user share one ingress subject; each answer goes to
//! `response_subject_prefix + user_id`, so a waiter only ever sees its own
//! user's responses.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use cb_domain::config::BusConfig;
use cb_domain::envelope::{InboundEnvelope, OutboundEnvelope, OutgoingMessage};
use cb_domain::error::{Error, Result};
use cb_domain::trace::TraceEvent;

use crate::traits::MessageBus;

/// Text handed to a waiter when the response payload cannot be decoded.
pub const UNDECODABLE_RESPONSE: &str = "Error processing response.";

#[derive(Debug, thiserror::Error)]
pub enum AwaitError {
    #[error("no response for {user_id} within {}s", .timeout.as_secs())]
    Timeout { user_id: String, timeout: Duration },

    #[error(transparent)]
    Bus(#[from] Error),
}

pub struct BusCorrelator {
    bus: Arc<dyn MessageBus>,
    inbound_subject: String,
    response_prefix: String,
}

impl BusCorrelator {
    pub fn new(bus: Arc<dyn MessageBus>, config: &BusConfig) -> Self {
        Self {
            bus,
            inbound_subject: config.inbound_subject.clone(),
            response_prefix: config.response_subject_prefix.clone(),
        }
    }

    pub fn inbound_subject(&self) -> &str {
        &self.inbound_subject
    }

    pub fn response_subject(&self, user_id: &str) -> String {
        format!("{}{user_id}", self.response_prefix)
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    /// Enqueue a user message on the ingress subject. Failures go to the
    /// caller; nothing is retried.
    pub async fn publish_inbound(&self, envelope: &InboundEnvelope) -> Result<()> {
        let payload = serde_json::to_vec(envelope)?;
        self.bus.publish(&self.inbound_subject, payload).await
    }

    /// Register `handler` for every inbound envelope.
    ///
    /// The handler is called in delivery order; each returned future runs on
    /// its own task so slow turns for one user never hold up other users.
    pub async fn subscribe_inbound<F, Fut>(&self, handler: F) -> Result<InboundSubscription>
    where
        F: Fn(InboundEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.bus.subscribe(&self.inbound_subject).await?;
        let subject = self.inbound_subject.clone();

        let pump = tokio::spawn(async move {
            while let Some(msg) = subscription.next().await {
                match serde_json::from_slice::<InboundEnvelope>(&msg.payload) {
                    Ok(envelope) => {
                        tokio::spawn(handler(envelope));
                    }
                    Err(e) => {
                        tracing::warn!(subject = %subject, error = %e, "skipping malformed inbound message");
                    }
                }
            }
            tracing::debug!(subject = %subject, "inbound subscription closed");
        });

        Ok(InboundSubscription { pump })
    }

    /// Publish `text` as the answer for `user_id`.
    pub async fn publish_outbound(&self, user_id: &str, text: &str) -> Result<()> {
        let envelope = OutboundEnvelope {
            user_id: user_id.to_owned(),
            text: text.to_owned(),
        };
        let subject = self.response_subject(user_id);
        let payload = serde_json::to_vec(&OutgoingMessage::from(&envelope))?;
        self.bus.publish(&subject, payload).await?;

        TraceEvent::OutboundPublished {
            user_id: user_id.to_owned(),
            subject,
            chars: text.chars().count(),
        }
        .emit();
        Ok(())
    }

    /// Wait for the next answer published for `user_id`.
    ///
    /// Only answers published after the subscription is in place are seen.
    /// The transient subscription is released on every exit path, including
    /// when this future is dropped.
    pub async fn await_outbound(
        &self,
        user_id: &str,
        timeout: Duration,
    ) -> std::result::Result<String, AwaitError> {
        let mut subscription = self.bus.subscribe(&self.response_subject(user_id)).await?;

        match tokio::time::timeout(timeout, subscription.next()).await {
            Ok(Some(msg)) => Ok(decode_outbound(&msg.payload)),
            Ok(None) => Err(AwaitError::Bus(Error::Bus("bus unavailable".into()))),
            Err(_) => Err(AwaitError::Timeout {
                user_id: user_id.to_owned(),
                timeout,
            }),
        }
    }
}

fn decode_outbound(payload: &[u8]) -> String {
    match serde_json::from_slice::<OutgoingMessage>(payload) {
        Ok(msg) => OutboundEnvelope::from(msg).text,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable response payload");
            UNDECODABLE_RESPONSE.to_owned()
        }
    }
}

/// Handle to the inbound pump task. Dropping it stops delivery.
#[derive(Debug)]
pub struct InboundSubscription {
    pump: JoinHandle<()>,
}

impl InboundSubscription {
    pub fn is_active(&self) -> bool {
        !self.pump.is_finished()
    }
}

impl Drop for InboundSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
