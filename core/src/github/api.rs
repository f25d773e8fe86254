//! GitHub API client
//!
//! Fetches content from GitHub repositories.

use super::{GITHUB_API_BASE, GITHUB_API_VERSION, USER_AGENT};
use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// Get raw file content from a repository's default branch
///
/// Returns `Ok(None)` when the repository or file does not exist.
pub async fn get_file_content(
    owner: &str,
    repo: &str,
    path: &str,
    token: &str,
    http: &dyn HttpClient,
) -> Result<Option<String>> {
    let url = format!(
        "{}/repos/{}/{}/contents/{}",
        GITHUB_API_BASE, owner, repo, path
    );

    let auth_header = format!("Bearer {}", token);
    let headers = [
        ("Authorization", auth_header.as_str()),
        ("Accept", "application/vnd.github.raw+json"),
        ("User-Agent", USER_AGENT),
        ("X-GitHub-Api-Version", GITHUB_API_VERSION),
    ];

    let response = http
        .get(&url, &headers)
        .await
        .map_err(|e| ApiError::upstream_error(format!("failed to call GitHub API: {}", e)))?;

    match response.status {
        200 => response
            .text()
            .map(Some)
            .map_err(|e| ApiError::upstream_error(format!("failed to read response: {}", e))),
        404 => Ok(None),
        status => Err(ApiError::upstream_error(format!(
            "GitHub API error fetching {}/{}/{}: HTTP {}",
            owner, repo, path, status
        ))),
    }
}
