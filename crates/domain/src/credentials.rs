use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The auth tokens forwarded to every external operation.
///
/// Replaced wholesale on refresh; never mutated field by field.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "d_bearer")]
    pub token_type: String,
    /// Expiry as Unix seconds. `<= 0` means the token carries no expiry.
    #[serde(default)]
    pub expiry_unix: i64,
}

impl CredentialSet {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_unix > 0 && self.expiry_unix <= now.timestamp()
    }

    /// A set is usable when it has an access token that is either still
    /// valid or can be refreshed by the operations service.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && (!self.is_expired_at(now) || !self.refresh_token.is_empty())
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_token", &mask(&self.access_token))
            .field("refresh_token", &mask(&self.refresh_token))
            .field("token_type", &self.token_type)
            .field("expiry_unix", &self.expiry_unix)
            .finish()
    }
}

fn mask(token: &str) -> String {
    if token.is_empty() {
        String::new()
    } else {
        let head: String = token.chars().take(4).collect();
        format!("{head}…")
    }
}

fn d_bearer() -> String {
    "Bearer".into()
}
