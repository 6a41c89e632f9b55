mod bus;
mod llm;
mod messages;
mod observability;
mod operations;
mod server;

pub use bus::*;
pub use llm::*;
pub use messages::*;
pub use observability::*;
pub use operations::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut error = |field: &str, message: &str| {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: field.into(),
                message: message.into(),
            });
        };

        if self.server.port == 0 {
            error("server.port", "port must be greater than 0");
        }
        if self.server.host.is_empty() {
            error("server.host", "host must not be empty");
        }
        if self.server.max_concurrent_requests == 0 {
            error("server.max_concurrent_requests", "must be greater than 0");
        }

        if self.bus.url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            error("bus.url", "url must not be empty when set");
        }
        if self.bus.inbound_subject.trim().is_empty() {
            error("bus.inbound_subject", "subject must not be empty");
        }
        if self.bus.response_subject_prefix.trim().is_empty() {
            error("bus.response_subject_prefix", "prefix must not be empty");
        }
        if self.bus.await_timeout_secs == 0 {
            error("bus.await_timeout_secs", "timeout must be greater than 0");
        }
        if self.bus.channel_capacity == 0 {
            error("bus.channel_capacity", "capacity must be greater than 0");
        }

        if self.llm.model.trim().is_empty() {
            error("llm.model", "model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            error("llm.temperature", "temperature must be between 0.0 and 2.0");
        }
        if self.llm.timeout_secs == 0 {
            error("llm.timeout_secs", "timeout must be greater than 0");
        }

        if self.operations.base_url.trim().is_empty() {
            error("operations.base_url", "base_url must not be empty");
        }
        if self.operations.timeout_secs == 0 {
            error("operations.timeout_secs", "timeout must be greater than 0");
        }
        if self.operations.transport == OperationsTransport::Grpc
            && self.operations.proto_package.trim().is_empty()
        {
            error("operations.proto_package", "package must not be empty for grpc");
        }

        // Sharing the inbound subject with a response prefix would route
        // answers back into the ingress handler.
        if self
            .bus
            .inbound_subject
            .starts_with(&self.bus.response_subject_prefix)
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "bus.inbound_subject".into(),
                message: "inbound subject falls under the response subject prefix".into(),
            });
        }

        if std::env::var(&self.llm.api_key_env).map_or(true, |v| v.is_empty()) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.api_key_env".into(),
                message: format!(
                    "environment variable '{}' is not set; model calls will fail",
                    self.llm.api_key_env
                ),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(cfg: &Config) -> Vec<String> {
        cfg.validate()
            .into_iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn defaults_have_no_errors() {
        assert!(errors_of(&Config::default()).is_empty());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut cfg = Config::default();
        cfg.bus.await_timeout_secs = 0;
        cfg.operations.timeout_secs = 0;
        let fields = errors_of(&cfg);
        assert!(fields.contains(&"bus.await_timeout_secs".to_string()));
        assert!(fields.contains(&"operations.timeout_secs".to_string()));
    }

    #[test]
    fn empty_bus_url_is_rejected() {
        let mut cfg = Config::default();
        cfg.bus.url = Some("  ".into());
        assert_eq!(errors_of(&cfg), vec!["bus.url".to_string()]);
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        let mut cfg = Config::default();
        cfg.llm.temperature = 3.5;
        assert_eq!(errors_of(&cfg), vec!["llm.temperature".to_string()]);
    }

    #[test]
    fn overlapping_subjects_warn() {
        let mut cfg = Config::default();
        cfg.bus.inbound_subject = "response.messages.inbound".into();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| {
            i.severity == ConfigSeverity::Warning && i.field == "bus.inbound_subject"
        }));
    }

    #[test]
    fn display_includes_severity_tag() {
        let issue = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(issue.to_string(), "[ERROR] server.port: port must be greater than 0");
    }
}
