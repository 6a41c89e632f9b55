use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External operations (calendar / email / contacts service)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsConfig {
    #[serde(default)]
    pub transport: OperationsTransport,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Protobuf package the gRPC services are declared in.
    #[serde(default = "d_proto_package")]
    pub proto_package: String,
    /// Bound on each individual operation call.
    #[serde(default = "d_15")]
    pub timeout_secs: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            transport: OperationsTransport::default(),
            base_url: d_base_url(),
            proto_package: d_proto_package(),
            timeout_secs: d_15(),
        }
    }
}

/// Wire protocol spoken to the operations service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationsTransport {
    /// The calendar, mail and contacts gRPC services.
    #[default]
    Grpc,
    /// A JSON gateway in front of those services.
    Http,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential source
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// OAuth token file written by the operations service's authorization
    /// callback.
    #[serde(default = "d_token_file")]
    pub token_file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_file: d_token_file(),
        }
    }
}

fn d_base_url() -> String {
    "http://localhost:50051".into()
}
fn d_proto_package() -> String {
    "mcp".into()
}
fn d_15() -> u64 {
    15
}
fn d_token_file() -> PathBuf {
    PathBuf::from("token.json")
}
