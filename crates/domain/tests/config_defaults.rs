use cb_domain::config::{Config, OperationsTransport, ProviderKind};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8082);
}

#[test]
fn default_subjects_match_reference_deployment() {
    let config = Config::default();
    assert_eq!(config.bus.inbound_subject, "incoming.messages");
    assert_eq!(config.bus.response_subject_prefix, "response.messages.");
    assert_eq!(config.bus.await_timeout_secs, 15);
    assert!(config.bus.url.is_none());
}

#[test]
fn default_operation_timeout_is_fifteen_seconds() {
    let config = Config::default();
    assert_eq!(config.operations.timeout_secs, 15);
}

#[test]
fn default_operations_transport_is_grpc() {
    let config = Config::default();
    assert_eq!(config.operations.transport, OperationsTransport::Grpc);
    assert_eq!(config.operations.base_url, "http://localhost:50051");
    assert_eq!(config.operations.proto_package, "mcp");
}

#[test]
fn http_operations_transport_parses() {
    let toml_str = r#"
[operations]
transport = "http"
base_url = "http://localhost:8090"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.operations.transport, OperationsTransport::Http);
    assert_eq!(config.operations.timeout_secs, 15);
}

#[test]
fn default_model_is_gemini_flash() {
    let config = Config::default();
    assert_eq!(config.llm.provider, ProviderKind::Google);
    assert_eq!(config.llm.model, "gemini-1.5-flash-latest");
    assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
    assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
}

#[test]
fn empty_file_parses_to_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.credentials.token_file.to_str(), Some("token.json"));
    assert!(config.messages.fallback.starts_with("Lo siento"));
}

#[test]
fn partial_sections_keep_other_defaults() {
    let toml_str = r#"
[bus]
url = "nats://localhost:4222"
response_subject_prefix = "answers."

[llm]
model = "gemini-2.0-flash"
temperature = 0.2

[messages]
fallback = "Sorry, I could not come up with an answer."
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.bus.url.as_deref(), Some("nats://localhost:4222"));
    assert_eq!(config.bus.response_subject_prefix, "answers.");
    assert_eq!(config.bus.inbound_subject, "incoming.messages");
    assert_eq!(config.llm.model, "gemini-2.0-flash");
    assert_eq!(config.llm.timeout_secs, 60);
    assert_eq!(config.messages.fallback, "Sorry, I could not come up with an answer.");
    assert!(config.messages.model_error.starts_with("Lo siento"));
}

#[test]
fn unknown_provider_kind_is_rejected() {
    let toml_str = r#"
[llm]
provider = "carrier-pigeon"
"#;
    assert!(toml::from_str::<Config>(toml_str).is_err());
}
