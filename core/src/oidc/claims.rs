//! Identity token claim sets

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ApiError, Result};

/// Claims of a verified identity token
///
/// Kept as a plain claim map so policies see every claim the issuer sent,
/// e.g. `input.claims.repository_owner` for GitHub Actions tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, serde_json::Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// String view of a scalar claim
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    /// Numeric claim, accepting integer and float encodings
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        let value = self.0.get(name)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get_str("iss")
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// Account the workload belongs to
    pub fn repository_owner(&self) -> Option<&str> {
        self.get_str("repository_owner")
    }
}

impl FromIterator<(String, serde_json::Value)> for Claims {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decode the payload segment of a compact JWT without verifying it
pub fn decode_unverified<T: serde::de::DeserializeOwned>(token: &str) -> Result<T> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ApiError::malformed_token("invalid JWT format"));
    }

    let payload = base64_url_decode(parts[1])?;
    serde_json::from_slice(&payload)
        .map_err(|e| ApiError::malformed_token(format!("invalid JWT claims: {}", e)))
}

/// Base64 URL decode, tolerating padding
fn base64_url_decode(input: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input)
        .or_else(|_| {
            use base64::engine::general_purpose::URL_SAFE;
            URL_SAFE.decode(input)
        })
        .map_err(|e| ApiError::malformed_token(format!("invalid base64: {}", e)))
}
