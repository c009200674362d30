//! Request-level orchestration: precondition checks, verification, attach
//!
//! The gate walks a fixed sequence per request; the first failed step raises
//! its classified error and nothing downstream runs. There are no retries and
//! no recovery transitions.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::Request;
use tracing::{debug, instrument};

use crate::error::KmsGateError;
use crate::ip::client_ip;
use crate::verifier::VerifyToken;

/// Literal credential scheme prefix required in the `Authorization` header.
const BEARER_PREFIX: &str = "Bearer ";

/// Request gate: extracts the caller IP and bearer token, delegates to the
/// verifier, and attaches the verified identity to the request.
///
/// Holds no per-request state; one gate serves all requests concurrently.
pub struct KmsGate<V: VerifyToken> {
    verifier: Arc<V>,
}

impl<V: VerifyToken> Clone for KmsGate<V> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<V: VerifyToken> KmsGate<V> {
    /// Creates a gate around a shared verifier.
    pub fn new(verifier: Arc<V>) -> Self {
        Self { verifier }
    }

    /// Authenticates a request, attaching the verified identity on success.
    ///
    /// Checks run in a fixed order: caller IP, `Authorization` presence,
    /// `Bearer` scheme, then remote verification. An unidentifiable network
    /// origin outranks a missing or malformed credential, so the IP check
    /// always runs first.
    ///
    /// # Errors
    ///
    /// Returns the classified error of the first failed step; verifier
    /// failures propagate unchanged.
    #[instrument(skip(self, req))]
    pub async fn authenticate<B>(&self, req: &mut Request<B>) -> Result<(), KmsGateError> {
        let ip = client_ip(req.headers(), req.extensions()).ok_or(KmsGateError::IpUnresolved)?;

        let header = req
            .headers()
            .get(AUTHORIZATION)
            .ok_or(KmsGateError::CredentialMissing)?;
        let header = header.to_str().map_err(|_| KmsGateError::SchemeInvalid)?;
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(KmsGateError::SchemeInvalid)?;

        let identity = self.verifier.verify(token, &ip.to_string()).await?;
        debug!(client_id = %identity.client_id, key_name = %identity.key_name, "request authenticated");
        identity.attach(req.extensions_mut());

        Ok(())
    }
}
