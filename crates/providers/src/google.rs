//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API. Auth is via an API key
//! sent in the `x-goog-api-key` header, never in the URL.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use cb_domain::config::LlmConfig;
use cb_domain::dialogue::{DialogueTurn, Role, TurnPart};
use cb_domain::error::{Error, Result};
use cb_domain::tool::{ToolArgs, ToolDefinition, ToolInvocation};
use cb_domain::trace::TraceEvent;

use crate::traits::{LlmProvider, ModelRequest, ModelResponse, ResponsePart};
use crate::util::{from_reqwest, resolve_api_key};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Build from the `[llm]` config section, reading the key from the
    /// configured environment variable.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.api_key_env)?;
        Self::new(
            &cfg.base_url,
            api_key,
            &cfg.model,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        default_model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: "google".into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.to_string(),
            client,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request serialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn build_body(req: &ModelRequest) -> Value {
    let contents: Vec<Value> = req.turns.iter().map(turn_to_gemini).collect();

    let mut body = json!({ "contents": contents });

    if !req.tools.is_empty() {
        let function_declarations: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
        body["tools"] = json!([{ "functionDeclarations": function_declarations }]);
    }

    if let Some(temp) = req.temperature {
        body["generationConfig"] = json!({ "temperature": temp });
    }

    body
}

fn turn_to_gemini(turn: &DialogueTurn) -> Value {
    // Gemini has no dedicated tool role; function responses ride on `user`.
    let role = match turn.role {
        Role::User | Role::ToolResult => "user",
        Role::Model => "model",
    };
    let parts: Vec<Value> = turn.parts.iter().map(part_to_gemini).collect();
    json!({ "role": role, "parts": parts })
}

fn part_to_gemini(part: &TurnPart) -> Value {
    match part {
        TurnPart::Text { text } => json!({ "text": text }),
        TurnPart::ToolCall { invocation } => json!({
            "functionCall": {
                "name": invocation.name,
                "args": invocation.args.to_json(),
            }
        }),
        // Gemini matches responses to calls by function name.
        TurnPart::ToolResult { result } => json!({
            "functionResponse": {
                "name": result.name,
                "response": result.response_body(),
            }
        }),
    }
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_gemini_response(body: &Value, model: &str) -> Result<ModelResponse> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "google".into(),
            message: "no candidates in response".into(),
        })?;

    let mut parts = Vec::new();
    let raw_parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    for part in raw_parts.into_iter().flatten() {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            parts.push(ResponsePart::Text(text.to_string()));
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let args = fc.get("args").map(ToolArgs::from_json).unwrap_or_default();
            parts.push(ResponsePart::ToolCall(ToolInvocation {
                call_id: format!("call_{}", uuid::Uuid::new_v4()),
                name,
                args,
            }));
        }
    }

    Ok(ModelResponse {
        parts,
        model: model.to_string(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn generate(&self, req: &ModelRequest) -> Result<ModelResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = build_body(req);

        tracing::debug!(
            provider = %self.id,
            url = %url,
            turns = req.turns.len(),
            "google generate request"
        );

        let started = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let response = parse_gemini_response(&resp_json, &model)?;

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model,
            duration_ms: started.elapsed().as_millis() as u64,
            text_parts: response.text_part_count(),
            tool_calls: response.tool_calls().len(),
        }
        .emit();

        Ok(response)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_domain::tool::ToolResult;

    fn invocation() -> ToolInvocation {
        ToolInvocation {
            call_id: "call_1".into(),
            name: "create_contact".into(),
            args: ToolArgs::new().with("display_name", "Joe Doe"),
        }
    }

    #[test]
    fn body_maps_roles_and_tools() {
        let inv = invocation();
        let mut payload = serde_json::Map::new();
        payload.insert("contact_id".into(), json!("people/c1"));

        let req = ModelRequest {
            turns: vec![
                DialogueTurn::user("add Joe Doe"),
                DialogueTurn {
                    role: Role::Model,
                    parts: vec![TurnPart::ToolCall {
                        invocation: inv.clone(),
                    }],
                },
                DialogueTurn::tool_results(vec![ToolResult::success(&inv, payload)]),
            ],
            tools: vec![ToolDefinition {
                name: "create_contact".into(),
                description: "Create a contact".into(),
                parameters: json!({ "type": "object" }),
            }],
            temperature: Some(0.7),
            model: None,
        };

        let body = build_body(&req);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "add Joe Doe");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(
            contents[1]["parts"][0]["functionCall"]["args"]["display_name"],
            "Joe Doe"
        );
        assert_eq!(contents[2]["role"], "user");
        let fr = &contents[2]["parts"][0]["functionResponse"];
        assert_eq!(fr["name"], "create_contact");
        assert_eq!(fr["response"]["result"]["contact_id"], "people/c1");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "create_contact"
        );
        assert!(body["generationConfig"]["temperature"].as_f64().is_some());
    }

    #[test]
    fn body_without_tools_omits_declarations() {
        let req = ModelRequest {
            turns: vec![DialogueTurn::user("hola")],
            ..Default::default()
        };
        let body = build_body(&req);
        assert!(body.get("tools").is_none());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn parse_keeps_part_order() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Voy a revisar." },
                        { "functionCall": { "name": "list_calendar_events", "args": { "max_results": 5 } } },
                        { "functionCall": { "name": "list_contacts", "args": {} } }
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        let resp = parse_gemini_response(&body, "gemini-1.5-flash-latest").unwrap();
        assert_eq!(resp.parts.len(), 3);
        assert_eq!(resp.first_text(), Some("Voy a revisar."));
        let calls = resp.tool_calls();
        assert_eq!(calls[0].name, "list_calendar_events");
        assert_eq!(calls[0].args.integer("max_results"), Some(5));
        assert_eq!(calls[1].name, "list_contacts");
        assert_ne!(calls[0].call_id, calls[1].call_id);
    }

    #[test]
    fn parse_without_parts_is_empty_response() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let resp = parse_gemini_response(&body, "m").unwrap();
        assert!(resp.parts.is_empty());
    }

    #[test]
    fn generate_url_carries_no_key() {
        let provider =
            GoogleProvider::new("https://g.example/", "AIzaSECRETKEY", "m", Duration::from_secs(1))
                .unwrap();
        let url = provider.generate_url("gemini-1.5-flash-latest");
        assert_eq!(
            url,
            "https://g.example/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_key() {
        // Port 1 refuses connections on loopback.
        let provider =
            GoogleProvider::new("http://127.0.0.1:1", "AIzaSECRETKEY", "m", Duration::from_secs(2))
                .unwrap();
        let err = provider.generate(&ModelRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_) | Error::Timeout(_)));
        assert!(!err.to_string().contains("AIzaSECRETKEY"), "{err}");
    }

    #[test]
    fn parse_without_candidates_is_provider_error() {
        let err = parse_gemini_response(&json!({}), "m").unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
