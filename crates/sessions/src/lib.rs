//! Per-user conversational state for chatbridge.
//!
//! A [`SessionStore`] owns one [`Session`] per user identifier. Each session
//! carries the model dialogue and a [`CredentialCache`] with the most recent
//! auth tokens; initial tokens come from a [`CredentialSource`].

pub mod credentials;
pub mod source;
pub mod store;

pub use credentials::CredentialCache;
pub use source::{CredentialSource, TokenFileSource};
pub use store::{Session, SessionStore};
