//! Single-issuer OIDC token verification
//!
//! Verifies signatures against the issuer's published JWKS and checks the
//! time-based claims against the platform clock.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::claims::{decode_unverified, Claims};
use super::discovery::{fetch_discovery, validate_issuer_url};
use super::jwks::fetch_jwks;
use super::Verifier;
use crate::config::JWKS_CACHE_TTL_SECS;
use crate::error::{ApiError, Result};
use crate::platform::{Clock, HttpClient};

/// Allowed clock skew for `nbf` and `iat`
const CLOCK_SKEW_SECS: u64 = 60;

/// Tokens older than this are rejected regardless of `exp`
const MAX_TOKEN_AGE_SECS: u64 = 24 * 60 * 60;

/// Verifies identity tokens from one trusted issuer
pub struct OidcVerifier {
    issuer: String,
    audience: Option<String>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    jwks: moka::future::Cache<String, Arc<JwkSet>>,
}

impl OidcVerifier {
    pub fn new(
        issuer: impl Into<String>,
        audience: Option<String>,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let issuer = issuer.into();
        validate_issuer_url(&issuer)?;

        Ok(Self {
            issuer,
            audience,
            http,
            clock,
            jwks: moka::future::Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(JWKS_CACHE_TTL_SECS))
                .build(),
        })
    }

    /// Issuer signing keys, from cache unless `refresh` is set
    async fn signing_keys(&self, refresh: bool) -> Result<Arc<JwkSet>> {
        if !refresh {
            if let Some(keys) = self.jwks.get(&self.issuer).await {
                return Ok(keys);
            }
        }

        let discovery = fetch_discovery(&self.issuer, self.http.as_ref()).await?;
        let keys = Arc::new(fetch_jwks(&discovery.jwks_uri, self.http.as_ref()).await?);
        debug!(issuer = %self.issuer, keys = keys.keys.len(), "fetched issuer signing keys");

        self.jwks.insert(self.issuer.clone(), keys.clone()).await;
        Ok(keys)
    }

    /// Find the key for `kid`, refreshing once to pick up rotated keys
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let mut keys = self.signing_keys(false).await?;
        if keys.find(kid).is_none() {
            keys = self.signing_keys(true).await?;
        }

        let jwk = keys.find(kid).ok_or_else(|| {
            ApiError::verification_failed(format!("key '{}' not found in JWKS", kid))
        })?;

        DecodingKey::from_jwk(jwk)
            .map_err(|e| ApiError::verification_failed(format!("invalid JWK: {}", e)))
    }

    fn check_times(&self, claims: &Claims) -> Result<()> {
        let now_secs = self.clock.now_secs();

        let exp = claims
            .get_u64("exp")
            .ok_or_else(|| ApiError::verification_failed("token missing 'exp' claim"))?;
        if exp <= now_secs {
            return Err(ApiError::verification_failed("token has expired"));
        }

        if let Some(nbf) = claims.get_u64("nbf") {
            if nbf > now_secs + CLOCK_SKEW_SECS {
                return Err(ApiError::verification_failed(
                    "token is not yet valid (nbf claim)",
                ));
            }
        }

        if let Some(iat) = claims.get_u64("iat") {
            if iat > now_secs + CLOCK_SKEW_SECS {
                return Err(ApiError::verification_failed(
                    "token issued in the future (iat claim)",
                ));
            }
            if iat + MAX_TOKEN_AGE_SECS < now_secs {
                return Err(ApiError::verification_failed("token is too old (iat claim)"));
            }
            if iat >= exp {
                return Err(ApiError::verification_failed("invalid token: iat >= exp"));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Verifier for OidcVerifier {
    #[tracing::instrument(skip_all, fields(issuer = %self.issuer))]
    async fn verify(&self, token: &str) -> Result<Claims> {
        let preview: Claims = decode_unverified(token)?;
        if preview.issuer() != Some(self.issuer.as_str()) {
            return Err(ApiError::verification_failed(format!(
                "token issuer {:?} does not match '{}'",
                preview.issuer(),
                self.issuer
            )));
        }
        validate_subject(preview.subject().unwrap_or_default())?;

        let header = decode_header(token)
            .map_err(|e| ApiError::malformed_token(format!("invalid JWT header: {}", e)))?;
        if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ApiError::verification_failed(
                "symmetric signing algorithms are not accepted",
            ));
        }
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| ApiError::malformed_token("JWT missing 'kid' header"))?;

        let decoding_key = self.decoding_key(kid).await?;

        // Time-based claims are checked against the injected clock below
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[&self.issuer]);
        match self.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| ApiError::verification_failed(format!("verifying token: {}", e)))?;

        self.check_times(&token_data.claims)?;
        Ok(token_data.claims)
    }
}

/// Validate subject format per OpenID Connect Core
fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty() {
        return Err(ApiError::malformed_token("subject cannot be empty"));
    }

    if subject.len() > 255 {
        return Err(ApiError::malformed_token("subject too long"));
    }

    if subject.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ApiError::malformed_token("subject contains invalid characters"));
    }

    Ok(())
}
