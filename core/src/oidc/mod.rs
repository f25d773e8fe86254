//! OIDC (OpenID Connect) module
//!
//! Verifies workload identity tokens from one or more trusted issuers.

mod claims;
mod discovery;
mod jwks;
mod multi;
mod validate;

use async_trait::async_trait;

use crate::error::Result;

pub use claims::{decode_unverified, Claims};
pub use multi::{new_verifier, MultiIssuerVerifier};
pub use validate::OidcVerifier;

/// Verifies an identity token and returns its claims
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims>;
}
