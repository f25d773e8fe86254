//! GitHub App authentication
//!
//! Generates App JWTs, looks up installations and requests installation
//! tokens.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::permissions::InstallationPermissions;
use super::{GITHUB_API_BASE, GITHUB_API_VERSION, USER_AGENT};
use crate::error::{ApiError, Result};
use crate::platform::{Clock, HttpClient, JwtSigner};

/// GitHub App JWT claims
#[derive(Serialize, Deserialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// A freshly minted installation token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallationToken {
    pub token: String,
    /// RFC 3339 expiry as reported by GitHub
    pub expires_at: String,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    repositories: &'a [String],
    #[serde(skip_serializing_if = "InstallationPermissions::is_empty")]
    permissions: &'a InstallationPermissions,
}

#[derive(Deserialize)]
struct InstallationResponse {
    id: u64,
}

/// JWT signer that uses a local PEM private key
pub struct PemJwtSigner {
    pub app_id: String,
    pub pem_key: String,
}

#[async_trait]
impl JwtSigner for PemJwtSigner {
    async fn sign_app_jwt(&self, now_secs: i64) -> Result<String> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let iat = now_secs - 60;
        let exp = now_secs + 600;

        let claims = AppJwtClaims {
            iat,
            exp,
            iss: self.app_id.clone(),
        };

        let key = EncodingKey::from_rsa_pem(self.pem_key.as_bytes())
            .map_err(|e| ApiError::internal(format!("invalid private key: {}", e)))?;

        let header = Header::new(Algorithm::RS256);

        encode(&header, &claims, &key)
            .map_err(|e| ApiError::internal(format!("failed to encode JWT: {}", e)))
    }
}

/// Client authenticated as a GitHub App
pub struct AppClient {
    signer: Arc<dyn JwtSigner>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl AppClient {
    pub fn new(signer: Arc<dyn JwtSigner>, http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self { signer, http, clock }
    }

    async fn app_auth_header(&self) -> Result<String> {
        let jwt = self.signer.sign_app_jwt(self.clock.now_secs() as i64).await?;
        Ok(format!("Bearer {}", jwt))
    }

    /// Installation ID of the app for `owner`
    ///
    /// Looks for an organization installation first and falls back to a
    /// user installation when the organization is unknown.
    pub async fn find_installation(&self, owner: &str) -> Result<u64> {
        let auth_header = self.app_auth_header().await?;
        let headers = [
            ("Authorization", auth_header.as_str()),
            ("Accept", "application/vnd.github+json"),
            ("User-Agent", USER_AGENT),
            ("X-GitHub-Api-Version", GITHUB_API_VERSION),
        ];

        let url = format!("{}/orgs/{}/installation", GITHUB_API_BASE, owner);
        let response = self
            .http
            .get(&url, &headers)
            .await
            .map_err(|e| ApiError::upstream_error(format!("failed to call GitHub API: {}", e)))?;

        let response = match response.status {
            200 => response,
            404 => {
                debug!(owner, "no organization installation, trying user");
                let url = format!("{}/users/{}/installation", GITHUB_API_BASE, owner);
                let response = self.http.get(&url, &headers).await.map_err(|e| {
                    ApiError::installation_not_found(format!("looking up user '{}': {}", owner, e))
                })?;
                if response.status != 200 {
                    return Err(ApiError::installation_not_found(format!(
                        "GitHub App not installed for '{}' (HTTP {})",
                        owner, response.status
                    )));
                }
                response
            }
            status => {
                return Err(ApiError::upstream_error(format!(
                    "looking up organization '{}': HTTP {}",
                    owner, status
                )))
            }
        };

        let installation: InstallationResponse = response
            .json()
            .map_err(|e| ApiError::upstream_error(format!("failed to parse response: {}", e)))?;

        Ok(installation.id)
    }

    /// Create an installation token with scoped permissions
    ///
    /// If `repositories` is non-empty, the token is restricted to those
    /// repository names. If empty, the token has access to all repos the
    /// installation can access.
    pub async fn create_installation_token(
        &self,
        installation_id: u64,
        repositories: &[String],
        permissions: &InstallationPermissions,
    ) -> Result<InstallationToken> {
        let auth_header = self.app_auth_header().await?;
        let headers = [
            ("Authorization", auth_header.as_str()),
            ("Accept", "application/vnd.github+json"),
            ("User-Agent", USER_AGENT),
            ("X-GitHub-Api-Version", GITHUB_API_VERSION),
        ];

        let body = serde_json::to_vec(&AccessTokenRequest {
            repositories,
            permissions,
        })
        .map_err(|e| ApiError::internal(format!("encoding token request: {}", e)))?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            GITHUB_API_BASE, installation_id
        );
        let response = self
            .http
            .post(&url, &headers, &body)
            .await
            .map_err(|e| ApiError::upstream_error(format!("failed to call GitHub API: {}", e)))?;

        if response.status != 201 {
            let error_body = response.text().unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError::upstream_error(format!(
                "GitHub API error ({}): {}",
                response.status, error_body
            )));
        }

        response
            .json()
            .map_err(|e| ApiError::upstream_error(format!("failed to parse response: {}", e)))
    }
}
