use serde::Serialize;

/// Structured trace events emitted across all chatbridge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        user_id: String,
        is_new: bool,
    },
    CredentialsLoaded {
        user_id: String,
        source: String,
        expiry_unix: i64,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        text_parts: usize,
        tool_calls: usize,
    },
    ToolExecuted {
        user_id: String,
        tool_name: String,
        duration_ms: u64,
        is_error: bool,
    },
    OutboundPublished {
        user_id: String,
        subject: String,
        chars: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cb_event");
    }
}
