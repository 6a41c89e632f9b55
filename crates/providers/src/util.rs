//! Shared utility functions for provider adapters.

use cb_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`]. The request URL is stripped so nothing carried in it
/// reaches the logs.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    let e = e.without_url();
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Read an API key from the environment variable `env_var`.
pub fn resolve_api_key(env_var: &str) -> Result<String> {
    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(Error::Auth(format!("environment variable '{env_var}' is empty"))),
        Err(_) => Err(Error::Auth(format!(
            "environment variable '{env_var}' not set or not valid UTF-8"
        ))),
    }
}
