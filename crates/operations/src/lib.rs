//! Contract for the calendar, mail and contacts operations service.
//!
//! Chatbridge never talks to Google directly: every tool call becomes one
//! request against an [`ExternalOperations`] implementation carrying the
//! user's credential set, over gRPC ([`GrpcOperations`]) or a JSON gateway
//! ([`HttpOperations`]).

pub mod grpc;
pub mod http;
pub mod traits;
pub mod types;
pub mod wire;

pub use grpc::GrpcOperations;
pub use http::HttpOperations;
pub use traits::ExternalOperations;
pub use types::*;
