//! Where a session's first credential set comes from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use cb_domain::credentials::CredentialSet;
use cb_domain::error::{Error, Result};

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Load the credentials to use for `user_id`.
    async fn load(&self, user_id: &str) -> Result<CredentialSet>;

    /// Short label for logs and trace events.
    fn name(&self) -> &str;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// token.json
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reads the OAuth token file written by the operations service after the
/// user authorized it. Every user shares the same file.
#[derive(Debug, Clone)]
pub struct TokenFileSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    /// RFC 3339; the zero time `0001-01-01T00:00:00Z` means no expiry.
    #[serde(default)]
    expiry: Option<String>,
}

impl TokenFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, raw: &str) -> Result<CredentialSet> {
        let file: TokenFile = serde_json::from_str(raw).map_err(|e| {
            Error::Auth(format!("unable to parse {}: {e}", self.path.display()))
        })?;

        if file.access_token.is_empty() {
            return Err(Error::Auth(format!(
                "{} has no access_token",
                self.path.display()
            )));
        }

        let expiry_unix = match file.expiry.as_deref() {
            None | Some("") => 0,
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map_err(|e| Error::Auth(format!("invalid expiry '{s}': {e}")))?
                .timestamp()
                .max(0),
        };

        Ok(CredentialSet {
            access_token: file.access_token,
            refresh_token: file.refresh_token,
            token_type: if file.token_type.is_empty() {
                "Bearer".into()
            } else {
                file.token_type
            },
            expiry_unix,
        })
    }
}

#[async_trait]
impl CredentialSource for TokenFileSource {
    async fn load(&self, _user_id: &str) -> Result<CredentialSet> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Auth(format!(
                "unable to read {}: {e}; authorize the operations service first",
                self.path.display()
            ))
        })?;
        self.parse(&raw)
    }

    fn name(&self) -> &str {
        "token_file"
    }
}
