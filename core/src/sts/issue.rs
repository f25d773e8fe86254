//! Installation token issuance

use std::sync::Arc;
use tracing::{info, warn};

use super::request::TokenRequest;
use crate::error::{ApiError, Result};
use crate::github::{Clients, InstallationPermissions};

/// A token handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: String,
}

/// Exchanges approved requests for installation tokens
pub struct Issuer {
    clients: Arc<Clients>,
}

impl Issuer {
    pub fn new(clients: Arc<Clients>) -> Self {
        Self { clients }
    }

    #[tracing::instrument(skip_all, fields(owner = request.owner()))]
    pub async fn issue(&self, request: &TokenRequest) -> Result<IssuedToken> {
        let installation = self.clients.installation(request.owner()).await?;

        let repositories = request.repository_names();
        let (permissions, dropped) = InstallationPermissions::from_request(&request.permissions);
        if !dropped.is_empty() {
            warn!(?dropped, "ignoring unknown permissions");
        }

        let token = installation
            .app()
            .create_installation_token(installation.installation_id(), &repositories, &permissions)
            .await
            .map_err(|e| ApiError::issuance_failed(e.to_string()))?;

        info!(
            installation_id = installation.installation_id(),
            repositories = ?repositories,
            expires_at = %token.expires_at,
            "issued installation token"
        );

        Ok(IssuedToken {
            token: token.token,
            expires_at: token.expires_at,
        })
    }
}
