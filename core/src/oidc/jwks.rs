//! JWKS (JSON Web Key Set) handling

use jsonwebtoken::jwk::JwkSet;

use crate::error::{ApiError, Result};
use crate::platform::HttpClient;

/// Fetch JWKS from a URI
pub async fn fetch_jwks(jwks_uri: &str, http: &dyn HttpClient) -> Result<JwkSet> {
    let response = http
        .get(
            jwks_uri,
            &[("Accept", "application/json"), ("User-Agent", "gtfo")],
        )
        .await
        .map_err(|e| ApiError::verification_failed(format!("failed to fetch JWKS: {}", e)))?;

    if response.status != 200 {
        return Err(ApiError::verification_failed(format!(
            "failed to fetch JWKS: HTTP {}",
            response.status
        )));
    }

    response
        .json()
        .map_err(|e| ApiError::verification_failed(format!("invalid JWKS: {}", e)))
}
