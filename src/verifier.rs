//! Remote verification against the KMS agent
//!
//! [`KmsVerifier`] owns the wire contract: it issues the verification call
//! and translates the raw HTTP outcome into a [`VerifiedIdentity`] or a
//! classified [`KmsGateError`]. Statuses outside the classified set and
//! transport failures are surfaced verbatim, never reinterpreted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::{ConfigError, KmsGateConfig};
use crate::error::KmsGateError;
use crate::identity::VerifiedIdentity;

/// Fallback detail when the agent's error body carries no message.
const DEFAULT_AGENT_MESSAGE: &str = "verification failed";

/// Verification seam between the gate and the remote agent.
///
/// The gate depends on this trait rather than on [`KmsVerifier`] directly so
/// the precondition flow can be tested without a live agent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerifyToken: Send + Sync {
    /// Verifies a bearer token and caller IP against the agent.
    ///
    /// # Errors
    ///
    /// Returns a classified [`KmsGateError`] derived from the agent's
    /// response, or an untouched transport error when no response arrived.
    async fn verify(&self, token: &str, ip: &str) -> Result<VerifiedIdentity, KmsGateError>;
}

/// Request body for `POST {agent_url}/m2m/verify`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRequest<'a> {
    token: &'a str,
    ip_address: &'a str,
}

/// Success body: `{ "result": { "clientId": ..., "keyName": ... } }`.
#[derive(Debug, Deserialize)]
struct VerificationResponse {
    #[serde(default)]
    result: Option<VerificationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResult {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    key_name: Option<String>,
}

/// Optional error body on non-2xx responses.
#[derive(Debug, Deserialize)]
struct AgentErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the remote KMS agent's verification endpoint.
///
/// Stateless beyond the shared connection pool; one instance serves all
/// requests concurrently. The agent address is fixed at construction.
#[derive(Debug, Clone)]
pub struct KmsVerifier {
    http_client: reqwest::Client,
    verify_url: String,
}

impl KmsVerifier {
    /// Creates a verifier for the configured agent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(config: &KmsGateConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;

        let base = config.agent_url_str().trim_end_matches('/');
        Ok(Self {
            http_client,
            verify_url: format!("{base}/m2m/verify"),
        })
    }

    /// Extracts the agent-supplied detail message from an error response.
    async fn agent_message(response: reqwest::Response) -> String {
        response
            .json::<AgentErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| DEFAULT_AGENT_MESSAGE.to_string())
    }

    /// Validates a 2xx body against the wire contract.
    fn decode_identity(body: VerificationResponse) -> Result<VerifiedIdentity, KmsGateError> {
        let result = body.result.ok_or_else(|| KmsGateError::AgentResponseInvalid {
            reason: "missing result object".to_string(),
        })?;

        let client_id = result
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| KmsGateError::AgentResponseInvalid {
                reason: "missing clientId".to_string(),
            })?;
        let key_name = result
            .key_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| KmsGateError::AgentResponseInvalid {
                reason: "missing keyName".to_string(),
            })?;

        let client_id = client_id
            .parse()
            .map_err(|e| KmsGateError::AgentResponseInvalid {
                reason: format!("unparseable clientId: {e}"),
            })?;

        Ok(VerifiedIdentity { client_id, key_name })
    }
}

#[async_trait]
impl VerifyToken for KmsVerifier {
    #[instrument(skip(self, token), fields(ip = %ip))]
    async fn verify(&self, token: &str, ip: &str) -> Result<VerifiedIdentity, KmsGateError> {
        let request = VerificationRequest {
            token,
            ip_address: ip,
        };

        let response = self
            .http_client
            .post(&self.verify_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: VerificationResponse =
                response
                    .json()
                    .await
                    .map_err(|e| KmsGateError::AgentResponseInvalid {
                        reason: format!("undeserializable body: {e}"),
                    })?;
            let identity = Self::decode_identity(body)?;
            debug!(client_id = %identity.client_id, "agent verified credentials");
            return Ok(identity);
        }

        match status.as_u16() {
            400 => {
                let message = Self::agent_message(response).await;
                warn!(%status, "agent judged request malformed");
                Err(KmsGateError::AgentBadRequest { message })
            }
            401 => {
                let message = Self::agent_message(response).await;
                debug!(%status, "agent denied credentials");
                Err(KmsGateError::AgentUnauthorized { message })
            }
            500 => {
                let message = Self::agent_message(response).await;
                warn!(%status, "agent reported internal fault");
                Err(KmsGateError::AgentFault { message })
            }
            _ => {
                warn!(%status, "unclassified agent status, surfacing verbatim");
                match response.error_for_status() {
                    Err(err) => Err(KmsGateError::Transport(err)),
                    // Non-success but not an HTTP error either (a bare 3xx):
                    // the agent broke the contract.
                    Ok(_) => Err(KmsGateError::AgentResponseInvalid {
                        reason: format!("unexpected status {status}"),
                    }),
                }
            }
        }
    }
}
