//! Token revocation
//!
//! Issued tokens are revocable: their holder can invalidate them early.

use crate::error::{ApiError, Result};
use crate::github::{GITHUB_API_BASE, GITHUB_API_VERSION, USER_AGENT};
use crate::platform::HttpClient;

/// Revoke a GitHub installation token
pub async fn revoke(token: &str, http: &dyn HttpClient) -> Result<()> {
    let url = format!("{}/installation/token", GITHUB_API_BASE);
    let auth_header = format!("Bearer {}", token);
    let headers = [
        ("Authorization", auth_header.as_str()),
        ("Accept", "application/vnd.github+json"),
        ("User-Agent", USER_AGENT),
        ("X-GitHub-Api-Version", GITHUB_API_VERSION),
    ];

    let response = http
        .delete(&url, &headers)
        .await
        .map_err(|e| ApiError::upstream_error(format!("failed to call GitHub API: {}", e)))?;

    match response.status {
        204 => Ok(()),
        401 => Err(ApiError::verification_failed(
            "token is invalid or already revoked",
        )),
        status => Err(ApiError::upstream_error(format!(
            "unexpected status from GitHub: {}",
            status
        ))),
    }
}
