//! OIDC Discovery document fetching

use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// OIDC Discovery document (partial)
#[derive(Debug, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
}

/// Fetch OIDC discovery document for an issuer
pub async fn fetch_discovery(issuer: &str, http: &dyn HttpClient) -> Result<DiscoveryDocument> {
    let discovery_url = format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    );

    let response = http
        .get(
            &discovery_url,
            &[("Accept", "application/json"), ("User-Agent", "gtfo")],
        )
        .await
        .map_err(|e| {
            ApiError::verification_failed(format!("failed to fetch discovery document: {}", e))
        })?;

    if response.status != 200 {
        return Err(ApiError::verification_failed(format!(
            "failed to fetch discovery document: HTTP {}",
            response.status
        )));
    }

    let doc: DiscoveryDocument = response.json().map_err(|e| {
        ApiError::verification_failed(format!("invalid discovery document: {}", e))
    })?;

    if doc.issuer != issuer && doc.issuer != issuer.trim_end_matches('/') {
        return Err(ApiError::verification_failed(format!(
            "issuer mismatch: expected '{}', got '{}'",
            issuer, doc.issuer
        )));
    }

    Ok(doc)
}

/// Validate a configured issuer URL per RFC 8414 and OpenID Connect Core 1.0
pub fn validate_issuer_url(issuer: &str) -> Result<()> {
    let url = url::Url::parse(issuer)
        .map_err(|_| ApiError::internal(format!("invalid issuer URL '{}'", issuer)))?;

    let is_localhost = matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    );
    if url.scheme() != "https" && !is_localhost {
        return Err(ApiError::internal("issuer must use HTTPS"));
    }

    if url.query().is_some() {
        return Err(ApiError::internal("issuer URL must not have query string"));
    }

    if url.fragment().is_some() {
        return Err(ApiError::internal("issuer URL must not have fragment"));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ApiError::internal("issuer URL must not have userinfo"));
    }

    Ok(())
}
