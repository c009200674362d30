//! KMS Gate - bearer-token request authentication backed by a remote agent.
//!
//! Intercepts inbound HTTP requests, extracts the bearer credential and
//! caller IP, delegates verification to a remote KMS agent, and attaches the
//! verified client identity and key name to the request's extensions for
//! downstream handlers.
//!
//! The core is framework-agnostic ([`KmsGate::authenticate`] over
//! [`http::Request`], [`KmsVerifier::verify`] for the wire contract); the
//! [`middleware`] module adapts it to Tower stacks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod ip;
pub mod middleware;
pub mod verifier;

pub use config::{ConfigError, KmsGateConfig};
pub use error::{ErrorCode, ErrorResponse, KmsGateError};
pub use gate::KmsGate;
pub use identity::{kms_client_id, kms_key_name, ClientId, VerifiedIdentity};
pub use ip::PeerAddr;
pub use middleware::{KmsGateLayer, KmsGateService};
pub use verifier::{KmsVerifier, VerifyToken};
