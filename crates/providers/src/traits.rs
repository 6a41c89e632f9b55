use cb_domain::dialogue::DialogueTurn;
use cb_domain::error::Result;
use cb_domain::tool::{ToolDefinition, ToolInvocation};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic generation request.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    /// The whole dialogue so far, oldest turn first. The last turn is the
    /// new user message or the batch of tool results being submitted.
    pub turns: Vec<DialogueTurn>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

/// One part of a model response, in the order the model produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    ToolCall(ToolInvocation),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub parts: Vec<ResponsePart>,
    /// The model that actually produced the response.
    pub model: String,
}

impl ModelResponse {
    /// The first text part, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            ResponsePart::Text(t) => Some(t.as_str()),
            ResponsePart::ToolCall(_) => None,
        })
    }

    /// Every tool invocation, in response order.
    pub fn tool_calls(&self) -> Vec<ToolInvocation> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::ToolCall(inv) => Some(inv.clone()),
                ResponsePart::Text(_) => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ResponsePart::ToolCall(_)))
    }

    pub fn text_part_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ResponsePart::Text(_)))
            .count()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait that every language-model adapter implements.
///
/// Adapters translate the dialogue and tool definitions into a vendor wire
/// format and the vendor reply back into ordered [`ResponsePart`]s.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, req: &ModelRequest) -> Result<ModelResponse>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// The model used when a request carries no override.
    fn default_model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_domain::tool::ToolArgs;

    fn call(name: &str) -> ResponsePart {
        ResponsePart::ToolCall(ToolInvocation {
            call_id: format!("call_{name}"),
            name: name.into(),
            args: ToolArgs::new(),
        })
    }

    #[test]
    fn first_text_skips_leading_tool_calls() {
        let resp = ModelResponse {
            parts: vec![
                call("list_contacts"),
                ResponsePart::Text("first".into()),
                ResponsePart::Text("second".into()),
            ],
            model: "m".into(),
        };
        assert_eq!(resp.first_text(), Some("first"));
        assert_eq!(resp.text_part_count(), 2);
    }

    #[test]
    fn tool_calls_keep_order() {
        let resp = ModelResponse {
            parts: vec![call("a"), ResponsePart::Text("x".into()), call("b")],
            model: "m".into(),
        };
        let names: Vec<_> = resp.tool_calls().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(resp.has_tool_calls());
    }

    #[test]
    fn empty_response_has_nothing() {
        let resp = ModelResponse::default();
        assert!(resp.first_text().is_none());
        assert!(!resp.has_tool_calls());
    }
}
