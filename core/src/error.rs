//! Error types and HTTP status mapping

use serde::Serialize;
use thiserror::Error;

/// Result type alias for token factory operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Token factory error with HTTP status code mapping
///
/// A policy denial is not an error of the authorization engine itself; the
/// exchange pipeline turns a `false` decision into [`ApiError::PermissionDenied`]
/// only when building the response.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("malformed token: {message}")]
    MalformedToken { message: String },

    #[error("unknown issuer: {issuer}")]
    UnknownIssuer { issuer: String },

    #[error("token verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("policy fetch failed: {message}")]
    PolicyFetchFailed { message: String },

    #[error("policy evaluation failed: {message}")]
    PolicyEvalFailed { message: String },

    #[error("expected {expected} repository policies, got {actual}")]
    PolicyResolutionInconsistent { expected: usize, actual: usize },

    #[error("no configuration for repository owner '{owner}'")]
    NoTenantConfig { owner: String },

    #[error("installation not found: {message}")]
    InstallationNotFound { message: String },

    #[error("token issuance failed: {message}")]
    IssuanceFailed { message: String },

    #[error("upstream error: {message}")]
    UpstreamError { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    pub fn unknown_issuer(issuer: impl Into<String>) -> Self {
        Self::UnknownIssuer {
            issuer: issuer.into(),
        }
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn policy_fetch_failed(message: impl Into<String>) -> Self {
        Self::PolicyFetchFailed {
            message: message.into(),
        }
    }

    pub fn policy_eval_failed(message: impl Into<String>) -> Self {
        Self::PolicyEvalFailed {
            message: message.into(),
        }
    }

    pub fn no_tenant_config(owner: impl Into<String>) -> Self {
        Self::NoTenantConfig {
            owner: owner.into(),
        }
    }

    pub fn installation_not_found(message: impl Into<String>) -> Self {
        Self::InstallationNotFound {
            message: message.into(),
        }
    }

    pub fn issuance_failed(message: impl Into<String>) -> Self {
        Self::IssuanceFailed {
            message: message.into(),
        }
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::MalformedToken { .. } => 401,
            Self::UnknownIssuer { .. } => 401,
            Self::VerificationFailed { .. } => 401,
            Self::PermissionDenied { .. } => 403,
            Self::PolicyFetchFailed { .. } => 500,
            Self::PolicyEvalFailed { .. } => 500,
            Self::PolicyResolutionInconsistent { .. } => 500,
            Self::NoTenantConfig { .. } => 500,
            Self::InstallationNotFound { .. } => 500,
            Self::IssuanceFailed { .. } => 502,
            Self::UpstreamError { .. } => 502,
            Self::Internal { .. } => 500,
        }
    }

    /// Get the error key for this error
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MalformedToken { .. } => "malformed_token",
            Self::UnknownIssuer { .. } => "unknown_issuer",
            Self::VerificationFailed { .. } => "verification_failed",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::PolicyFetchFailed { .. } => "policy_fetch_failed",
            Self::PolicyEvalFailed { .. } => "policy_eval_failed",
            Self::PolicyResolutionInconsistent { .. } => "policy_resolution_inconsistent",
            Self::NoTenantConfig { .. } => "no_tenant_config",
            Self::InstallationNotFound { .. } => "installation_not_found",
            Self::IssuanceFailed { .. } => "issuance_failed",
            Self::UpstreamError { .. } => "upstream_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Message safe to return to the caller
    ///
    /// Client-caused errors carry their full message. Server-side failures
    /// only expose the error key; the detail belongs in the logs.
    pub fn public_message(&self) -> String {
        if self.status_code() < 500 {
            self.to_string()
        } else {
            self.error_key().replace('_', " ")
        }
    }
}

/// Token endpoint response body
///
/// Successful and failed responses share this shape; `error` is only
/// present on failure.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub revocable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenResponse {
    pub fn issued(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            revocable: true,
            error: None,
        }
    }
}

impl From<&ApiError> for TokenResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            token: String::new(),
            revocable: true,
            error: Some(err.public_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failures_map_to_401() {
        let errors = [
            ApiError::malformed_token("bad"),
            ApiError::unknown_issuer("https://nope.example.com"),
            ApiError::verification_failed("expired"),
        ];
        for err in &errors {
            assert_eq!(err.status_code(), 401);
        }
        assert_eq!(ApiError::permission_denied("no").status_code(), 403);
    }

    #[test]
    fn test_denial_is_distinct_from_policy_errors() {
        assert_eq!(ApiError::permission_denied("no").status_code(), 403);
        assert_eq!(ApiError::policy_fetch_failed("boom").status_code(), 500);
        assert_eq!(ApiError::policy_eval_failed("boom").status_code(), 500);
        assert_eq!(
            ApiError::PolicyResolutionInconsistent {
                expected: 2,
                actual: 1
            }
            .status_code(),
            500
        );
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = ApiError::issuance_failed("GitHub API error (422): secret detail");
        assert_eq!(err.public_message(), "issuance failed");

        let err = ApiError::invalid_request("repositories must not be empty");
        assert!(err.public_message().contains("repositories must not be empty"));
    }

    #[test]
    fn test_token_response_serialization() {
        let ok = serde_json::to_value(TokenResponse::issued("ghs_abc")).unwrap();
        assert_eq!(ok, serde_json::json!({"token": "ghs_abc", "revocable": true}));

        let err = serde_json::to_value(TokenResponse::from(&ApiError::permission_denied(
            "not authorized",
        )))
        .unwrap();
        assert_eq!(err["token"], "");
        assert_eq!(err["error"], "permission denied: not authorized");
    }
}
