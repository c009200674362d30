//! Classified error types for the verification flow
//!
//! Every failure on the request path maps to exactly one of a closed set of
//! kinds ([`ErrorCode`]). Errors are raised at the point of detection and
//! propagated unchanged to the request-handling boundary; nothing on the path
//! retries, recovers, or reclassifies.

use http::StatusCode;
use thiserror::Error;

/// Errors produced while gating a request.
///
/// Local precondition failures (`IpUnresolved`, `CredentialMissing`,
/// `SchemeInvalid`) are raised before the remote agent is contacted. The
/// `Agent*` variants are derived from the agent's HTTP status; `Transport`
/// carries an untouched [`reqwest::Error`] for failures this crate refuses to
/// reinterpret.
#[derive(Error, Debug)]
pub enum KmsGateError {
    /// Caller IP could not be determined from the request
    #[error("client IP could not be determined")]
    IpUnresolved,

    /// `Authorization` header was not present
    #[error("authorization header missing")]
    CredentialMissing,

    /// `Authorization` header present but not a `Bearer` credential
    #[error("authorization header is not a Bearer credential")]
    SchemeInvalid,

    /// Agent answered 400: it judged the token or request fields malformed
    #[error("agent rejected request: {message}")]
    AgentBadRequest {
        /// Detail from the agent's response body, when present
        message: String,
    },

    /// Agent answered 401: token/IP combination denied
    #[error("agent denied credentials: {message}")]
    AgentUnauthorized {
        /// Detail from the agent's response body, when present
        message: String,
    },

    /// Agent answered 500: fault on the agent's side
    #[error("agent internal error: {message}")]
    AgentFault {
        /// Detail from the agent's response body, when present
        message: String,
    },

    /// Agent's success response violated the wire contract
    #[error("invalid response from KMS agent: {reason}")]
    AgentResponseInvalid {
        /// What was missing or malformed
        reason: String,
    },

    /// The remote call could not be completed, or the agent answered with a
    /// status outside the classified set. Never wrapped, never reclassified.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// The closed set of failure kinds visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unidentifiable network origin; rejected before verification
    Forbidden,
    /// Malformed authentication envelope or agent-judged bad input
    BadRequest,
    /// Agent rejected the token/IP combination
    Unauthorized,
    /// Agent reported an internal fault
    AgentInternalError,
    /// Agent's success response was missing required fields
    AgentResponseInvalid,
    /// Unclassified transport or agent behavior, surfaced verbatim
    TransportFailure,
}

impl ErrorCode {
    /// String form of the code for structured logs and response bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forbidden => "KMS_FORBIDDEN",
            Self::BadRequest => "KMS_BAD_REQUEST",
            Self::Unauthorized => "KMS_UNAUTHORIZED",
            Self::AgentInternalError => "KMS_AGENT_INTERNAL_ERROR",
            Self::AgentResponseInvalid => "KMS_AGENT_RESPONSE_INVALID",
            Self::TransportFailure => "KMS_TRANSPORT_FAILURE",
        }
    }

    /// HTTP status a boundary layer should render for this kind.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AgentInternalError | Self::AgentResponseInvalid => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TransportFailure => StatusCode::BAD_GATEWAY,
        }
    }
}

impl KmsGateError {
    /// Get the failure kind for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IpUnresolved => ErrorCode::Forbidden,
            Self::CredentialMissing | Self::SchemeInvalid | Self::AgentBadRequest { .. } => {
                ErrorCode::BadRequest
            }
            Self::AgentUnauthorized { .. } => ErrorCode::Unauthorized,
            Self::AgentFault { .. } => ErrorCode::AgentInternalError,
            Self::AgentResponseInvalid { .. } => ErrorCode::AgentResponseInvalid,
            Self::Transport(_) => ErrorCode::TransportFailure,
        }
    }

    /// HTTP status a boundary layer should render for this error.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        self.code().http_status()
    }
}

/// Rendered form of a failure for the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// Failure kind for programmatic handling
    pub code: ErrorCode,
    /// HTTP status to answer with
    pub status: StatusCode,
    /// Human-readable detail, agent-supplied where available
    pub message: String,
}

impl ErrorResponse {
    /// Build the boundary rendering of an error.
    #[must_use]
    pub fn from_error(error: &KmsGateError) -> Self {
        Self {
            code: error.code(),
            status: error.http_status(),
            message: error.to_string(),
        }
    }
}

impl From<&KmsGateError> for ErrorResponse {
    fn from(error: &KmsGateError) -> Self {
        Self::from_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_codes() {
        assert_eq!(KmsGateError::IpUnresolved.code(), ErrorCode::Forbidden);
        assert_eq!(KmsGateError::CredentialMissing.code(), ErrorCode::BadRequest);
        assert_eq!(KmsGateError::SchemeInvalid.code(), ErrorCode::BadRequest);
    }

    #[test]
    fn test_agent_status_codes() {
        let bad = KmsGateError::AgentBadRequest { message: "m".into() };
        let denied = KmsGateError::AgentUnauthorized { message: "m".into() };
        let fault = KmsGateError::AgentFault { message: "m".into() };
        let invalid = KmsGateError::AgentResponseInvalid { reason: "r".into() };

        assert_eq!(bad.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(denied.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fault.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(invalid.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_code_strings_are_stable() {
        assert_eq!(ErrorCode::Forbidden.as_str(), "KMS_FORBIDDEN");
        assert_eq!(ErrorCode::BadRequest.as_str(), "KMS_BAD_REQUEST");
        assert_eq!(ErrorCode::Unauthorized.as_str(), "KMS_UNAUTHORIZED");
        assert_eq!(
            ErrorCode::TransportFailure.as_str(),
            "KMS_TRANSPORT_FAILURE"
        );
    }

    #[test]
    fn test_response_preserves_agent_message() {
        let err = KmsGateError::AgentUnauthorized {
            message: "ip not allowed".into(),
        };
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.code, ErrorCode::Unauthorized);
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.message.contains("ip not allowed"));
    }
}
