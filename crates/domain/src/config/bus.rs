use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message bus
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Subject naming and wait bounds for the message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// NATS server URL. Unset runs the in-process bus.
    #[serde(default)]
    pub url: Option<String>,
    /// Shared ingress subject all inbound envelopes are published on.
    #[serde(default = "d_inbound_subject")]
    pub inbound_subject: String,
    /// Prefix of the per-user response subject (`<prefix><user_id>`).
    #[serde(default = "d_response_prefix")]
    pub response_subject_prefix: String,
    /// How long `GET /response/:user_id` waits for the next answer.
    #[serde(default = "d_15")]
    pub await_timeout_secs: u64,
    /// Per-subscriber buffer size.
    #[serde(default = "d_256")]
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: None,
            inbound_subject: d_inbound_subject(),
            response_subject_prefix: d_response_prefix(),
            await_timeout_secs: d_15(),
            channel_capacity: d_256(),
        }
    }
}

fn d_inbound_subject() -> String {
    "incoming.messages".into()
}
fn d_response_prefix() -> String {
    "response.messages.".into()
}
fn d_15() -> u64 {
    15
}
fn d_256() -> usize {
    256
}
