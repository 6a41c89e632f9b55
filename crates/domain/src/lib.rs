//! Shared domain types for chatbridge: errors, configuration, credentials,
//! bus envelopes, the model dialogue and tool invocations.

pub mod config;
pub mod credentials;
pub mod dialogue;
pub mod envelope;
pub mod error;
pub mod tool;
pub mod trace;
