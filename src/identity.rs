//! Verified client identity and request-scoped accessors
//!
//! A [`VerifiedIdentity`] is only ever constructed by the verifier from a
//! complete agent response and is attached to the request's extensions as a
//! single value, so the client ID and key name are visible to downstream
//! handlers together or not at all.

use std::fmt;
use std::str::FromStr;

use http::Extensions;
use thiserror::Error;

/// The client identifier asserted by the KMS agent.
///
/// Opaque beyond equality, hashing, and string rendering. Parsing rejects
/// empty values and values containing whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

/// Rejected client identifier input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClientIdError {
    /// Empty input
    #[error("client id is empty")]
    Empty,
    /// Input contained whitespace or control characters
    #[error("client id contains whitespace or control characters")]
    InvalidCharacters,
}

impl FromStr for ClientId {
    type Err = ClientIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ClientIdError::Empty);
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ClientIdError::InvalidCharacters);
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ClientId {
    /// Borrows the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a successful verification: the identity the agent asserts is
/// bound to the presented token/IP combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Verified client identifier
    pub client_id: ClientId,
    /// Name of the cryptographic key associated with the client
    pub key_name: String,
}

impl VerifiedIdentity {
    /// Attaches this identity to a request's extensions.
    pub fn attach(self, extensions: &mut Extensions) {
        extensions.insert(self);
    }
}

/// Reads the verified client ID attached by the gate, if any.
#[must_use]
pub fn kms_client_id(extensions: &Extensions) -> Option<&ClientId> {
    extensions.get::<VerifiedIdentity>().map(|id| &id.client_id)
}

/// Reads the verified key name attached by the gate, if any.
#[must_use]
pub fn kms_key_name(extensions: &Extensions) -> Option<&str> {
    extensions
        .get::<VerifiedIdentity>()
        .map(|id| id.key_name.as_str())
}
