//! Multi-issuer dispatch
//!
//! Routes each token to the verifier registered for its (unverified) `iss`
//! claim. The delegate performs the real verification.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::claims::{decode_unverified, Claims};
use super::validate::OidcVerifier;
use super::Verifier;
use crate::error::{ApiError, Result};
use crate::platform::{Clock, HttpClient};

#[derive(Deserialize)]
struct IssuerPreview {
    #[serde(default)]
    iss: String,
}

/// Dispatches tokens to per-issuer verifiers
pub struct MultiIssuerVerifier {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl MultiIssuerVerifier {
    pub fn new(verifiers: HashMap<String, Arc<dyn Verifier>>) -> Self {
        Self { verifiers }
    }
}

#[async_trait]
impl Verifier for MultiIssuerVerifier {
    async fn verify(&self, token: &str) -> Result<Claims> {
        let preview: IssuerPreview = decode_unverified(token)?;
        let verifier = self
            .verifiers
            .get(&preview.iss)
            .ok_or_else(|| ApiError::unknown_issuer(preview.iss.clone()))?;
        verifier.verify(token).await
    }
}

/// Build a verifier for the configured issuers
///
/// Always a [`MultiIssuerVerifier`] over one [`OidcVerifier`] per issuer, so
/// a foreign issuer is reported the same way however many are configured.
pub fn new_verifier(
    issuers: &[String],
    audience: Option<String>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn Verifier>> {
    if issuers.is_empty() {
        return Err(ApiError::internal("no issuers"));
    }

    let mut verifiers: HashMap<String, Arc<dyn Verifier>> = HashMap::new();
    for issuer in issuers {
        let verifier = OidcVerifier::new(
            issuer.clone(),
            audience.clone(),
            http.clone(),
            clock.clone(),
        )
        .map_err(|e| {
            ApiError::internal(format!("creating verifier for issuer {:?}: {}", issuer, e))
        })?;
        verifiers.insert(issuer.clone(), Arc::new(verifier));
    }
    Ok(Arc::new(MultiIssuerVerifier::new(verifiers)))
}
