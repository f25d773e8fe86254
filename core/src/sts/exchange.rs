//! Token exchange
//!
//! Exchanges a workload identity token and a token request for a scoped
//! GitHub installation token.

use std::sync::Arc;
use tracing::{debug, info};

use super::issue::{IssuedToken, Issuer};
use super::request::TokenRequest;
use crate::error::{ApiError, Result};
use crate::oidc::Verifier;
use crate::policy::AuthorizationEngine;

/// The verify, authorize, issue pipeline
pub struct TokenService {
    verifier: Arc<dyn Verifier>,
    engine: AuthorizationEngine,
    issuer: Issuer,
}

impl TokenService {
    pub fn new(verifier: Arc<dyn Verifier>, engine: AuthorizationEngine, issuer: Issuer) -> Self {
        Self {
            verifier,
            engine,
            issuer,
        }
    }

    /// Handle one exchange
    ///
    /// The caller is authenticated before the request body is looked at.
    pub async fn exchange(&self, bearer_token: &str, body: &[u8]) -> Result<IssuedToken> {
        let claims = self.verifier.verify(bearer_token).await?;
        debug!(
            issuer = claims.issuer().unwrap_or_default(),
            subject = claims.subject().unwrap_or_default(),
            "verified identity token"
        );

        let request = TokenRequest::from_json(body)?;
        debug!(
            repositories = ?request.repositories,
            permissions = ?request.permissions,
            "parsed token request"
        );

        if !self.engine.authorize(&claims, &request).await? {
            info!(subject = claims.subject().unwrap_or_default(), "token request denied");
            return Err(ApiError::permission_denied("not authorized"));
        }

        self.issuer.issue(&request).await
    }
}
