//! The per-message turn: session, credentials, model, tools, answer.
//!
//! Exactly one round of tool calling per inbound message: model → tools →
//! model → answer. Tool calls in the second model response are not run.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::Instrument;
use tokio_util::sync::CancellationToken;

use cb_bus::BusCorrelator;
use cb_domain::config::MessagesConfig;
use cb_domain::credentials::CredentialSet;
use cb_domain::dialogue::{DialogueTurn, Role, TurnPart};
use cb_domain::envelope::InboundEnvelope;
use cb_domain::error::{Error, Result};
use cb_domain::tool::ToolDefinition;
use cb_domain::trace::TraceEvent;
use cb_providers::{LlmProvider, ModelRequest, ModelResponse, ResponsePart};
use cb_sessions::{CredentialSource, Session, SessionStore};

use super::session_lock::SessionLockMap;
use super::tools::ToolDispatcher;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a finished turn publishes to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a text answer.
    Answered(String),
    /// The model produced no text; the fallback message is sent.
    Fallback(String),
    /// No usable credentials could be loaded.
    AuthRequired(String),
    /// The first model submission failed.
    ModelFailed(String),
    /// Submitting the tool results back to the model failed.
    ToolReportFailed(String),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered(t)
            | TurnOutcome::Fallback(t)
            | TurnOutcome::AuthRequired(t)
            | TurnOutcome::ModelFailed(t)
            | TurnOutcome::ToolReportFailed(t) => t,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnOutcome::Answered(_) => "answered",
            TurnOutcome::Fallback(_) => "fallback",
            TurnOutcome::AuthRequired(_) => "auth_required",
            TurnOutcome::ModelFailed(_) => "model_failed",
            TurnOutcome::ToolReportFailed(_) => "tool_report_failed",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Driver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Model settings applied to every submission.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

pub struct TurnDriver {
    pub sessions: Arc<SessionStore>,
    pub locks: Arc<SessionLockMap>,
    pub credentials: Arc<dyn CredentialSource>,
    pub llm: Arc<dyn LlmProvider>,
    pub dispatcher: ToolDispatcher,
    pub correlator: Arc<BusCorrelator>,
    pub tools: Vec<ToolDefinition>,
    pub settings: ModelSettings,
    pub messages: MessagesConfig,
    pub shutdown: CancellationToken,
}

impl TurnDriver {
    /// Run one inbound message to completion and publish the answer.
    ///
    /// Turns for the same user never overlap. Shutdown aborts the turn
    /// (and any in-flight model or tool call) without publishing.
    pub async fn handle(&self, envelope: InboundEnvelope) {
        let user_id = envelope.user_id.clone();
        let turn_span = tracing::info_span!(
            "turn",
            user_id = %user_id,
            outcome = tracing::field::Empty,
            "otel.kind" = "SERVER",
        );

        async {
            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("turn aborted by shutdown");
                    return;
                }
                outcome = self.run_serialized(&envelope) => outcome,
            };
            let Some(outcome) = outcome else { return };

            tracing::Span::current().record("outcome", outcome.kind());
            if let Err(e) = self
                .correlator
                .publish_outbound(&user_id, outcome.text())
                .await
            {
                tracing::error!(error = %e, "failed to publish answer");
            }
        }
        .instrument(turn_span)
        .await
    }

    async fn run_serialized(&self, envelope: &InboundEnvelope) -> Option<TurnOutcome> {
        let _permit = match self.locks.acquire(&envelope.user_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "could not acquire turn lock");
                return None;
            }
        };
        Some(self.run_turn(envelope).await)
    }

    /// The turn state machine. Callers must hold the user's turn lock.
    pub async fn run_turn(&self, envelope: &InboundEnvelope) -> TurnOutcome {
        tracing::debug!(chars = envelope.text.chars().count(), "turn started");

        // 1. Session.
        let session = self.sessions.get_or_create(&envelope.user_id);
        if session.ensure_dialogue() {
            tracing::debug!("started new dialogue");
        }

        // 2. Credentials.
        let credentials = match self.ensure_credentials(&session).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "no usable credentials");
                return TurnOutcome::AuthRequired(format!(
                    "{} (Error: {e})",
                    self.messages.auth_required
                ));
            }
        };

        // 3. First submission. Nothing is committed until the turn ends,
        // so a failed submission leaves the stored dialogue untouched.
        let history = session.dialogue_snapshot();
        let mut pending = vec![DialogueTurn::user(envelope.text.as_str())];

        let first = match self.submit(history.turns(), &pending).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "model submission failed");
                return TurnOutcome::ModelFailed(self.messages.model_error.clone());
            }
        };

        // 4. Classification.
        let invocations = first.tool_calls();
        if invocations.is_empty() {
            return self.finish(&session, pending, &first);
        }
        pending.push(model_turn(&first));

        let futures = invocations.iter().map(|inv| {
            let span = tracing::info_span!("tool.call", tool = %inv.name, call_id = %inv.call_id);
            self.dispatcher
                .execute(&envelope.user_id, &credentials, inv)
                .instrument(span)
        });
        let results = join_all(futures).await;
        tracing::debug!(
            calls = results.len(),
            failed = results.iter().filter(|r| r.is_error()).count(),
            "tool round finished"
        );

        // 5. Resubmission of the whole batch.
        pending.push(DialogueTurn::tool_results(results));
        let second = match self.submit(history.turns(), &pending).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(error = %e, "tool result submission failed");
                return TurnOutcome::ToolReportFailed(self.messages.tool_report_error.clone());
            }
        };
        if second.has_tool_calls() {
            tracing::debug!(
                calls = second.tool_calls().len(),
                "ignoring tool calls after the tool round"
            );
        }

        // 6/7. Final extraction.
        self.finish(&session, pending, &second)
    }

    async fn ensure_credentials(&self, session: &Session) -> Result<CredentialSet> {
        if let Some(cached) = session.credentials().get() {
            if cached.is_usable_at(chrono::Utc::now()) {
                return Ok(cached);
            }
            tracing::debug!("cached credentials expired, reloading");
        }

        let loaded = self.credentials.load(session.user_id()).await?;
        self.sessions
            .update_credentials(session.user_id(), loaded.clone());
        TraceEvent::CredentialsLoaded {
            user_id: session.user_id().to_owned(),
            source: self.credentials.name().to_owned(),
            expiry_unix: loaded.expiry_unix,
        }
        .emit();
        Ok(loaded)
    }

    async fn submit(
        &self,
        history: &[DialogueTurn],
        pending: &[DialogueTurn],
    ) -> Result<ModelResponse> {
        let req = ModelRequest {
            turns: history.iter().chain(pending).cloned().collect(),
            tools: self.tools.clone(),
            temperature: self.settings.temperature,
            model: self.settings.model.clone(),
        };

        let span = tracing::info_span!(
            "llm.call",
            "otel.kind" = "CLIENT",
            provider = %self.llm.provider_id(),
            model = req.model.as_deref().unwrap_or(self.llm.default_model()),
            turns = req.turns.len(),
        );

        match tokio::time::timeout(self.settings.timeout, self.llm.generate(&req))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "model call exceeded {}s",
                self.settings.timeout.as_secs()
            ))),
        }
    }

    /// Commit the turn's dialogue and pick the answer from `response`.
    ///
    /// The stored model turn holds only the text the user saw, so a
    /// dangling tool call never reaches the next submission.
    fn finish(
        &self,
        session: &Session,
        mut pending: Vec<DialogueTurn>,
        response: &ModelResponse,
    ) -> TurnOutcome {
        let outcome = match response.first_text() {
            Some(text) => TurnOutcome::Answered(text.to_owned()),
            None => TurnOutcome::Fallback(self.messages.fallback.clone()),
        };

        let mut parts: Vec<TurnPart> = response
            .parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text(text) => Some(TurnPart::Text { text: text.clone() }),
                ResponsePart::ToolCall(_) => None,
            })
            .collect();
        if parts.is_empty() {
            parts.push(TurnPart::Text {
                text: outcome.text().to_owned(),
            });
        }
        pending.push(DialogueTurn {
            role: Role::Model,
            parts,
        });

        session.append_turns(pending);
        outcome
    }
}

/// The model turn exactly as produced, tool calls included.
fn model_turn(response: &ModelResponse) -> DialogueTurn {
    DialogueTurn {
        role: Role::Model,
        parts: response
            .parts
            .iter()
            .map(|p| match p {
                ResponsePart::Text(text) => TurnPart::Text { text: text.clone() },
                ResponsePart::ToolCall(invocation) => TurnPart::ToolCall {
                    invocation: invocation.clone(),
                },
            })
            .collect(),
    }
}
