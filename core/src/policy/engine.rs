//! Authorization decisions
//!
//! Combines the owner policy with the per-repository policies:
//!
//! 1. An owner policy that allows approves the request outright.
//! 2. Owner-level permissions can only be granted by the owner policy.
//! 3. Otherwise every requested repository must carry a policy and every
//!    one of them must allow.

use std::sync::Arc;
use tracing::{debug, info};

use super::resolve::{PolicyResolver, PolicySource, ResolvedPolicies};
use crate::config::RegoConfig;
use crate::error::{ApiError, Result};
use crate::oidc::Claims;
use crate::sts::TokenRequest;

pub struct AuthorizationEngine {
    resolver: PolicyResolver,
}

impl AuthorizationEngine {
    pub fn new(source: Arc<dyn PolicySource>, config: RegoConfig) -> Self {
        Self {
            resolver: PolicyResolver::new(source, config),
        }
    }

    /// Decide whether `claims` may receive the token described by `request`
    ///
    /// `Ok(false)` is a denial; errors are reserved for resolution and
    /// evaluation failures.
    #[tracing::instrument(skip_all, fields(owner = request.owner(), subject = claims.subject().unwrap_or_default()))]
    pub async fn authorize(&self, claims: &Claims, request: &TokenRequest) -> Result<bool> {
        let resolved = self.resolver.resolve(request).await?;
        let allowed = decide(&resolved, claims, request)?;
        info!(allowed, "authorization decision");
        Ok(allowed)
    }
}

/// Apply the decision order to already-resolved policies
pub fn decide(resolved: &ResolvedPolicies, claims: &Claims, request: &TokenRequest) -> Result<bool> {
    if let Some(ref owner) = resolved.owner {
        let allowed = owner.evaluate(claims, request)?;
        debug!(location = %owner.location(), allowed, "evaluated owner policy");
        if allowed {
            return Ok(true);
        }
    }

    if request.has_owner_permissions() {
        debug!("owner-level permissions requested without owner approval");
        return Ok(false);
    }

    if !resolved.targets_enabled || resolved.owner_targeted {
        return Ok(false);
    }

    if resolved.targets.len() != resolved.requested_targets {
        return Err(ApiError::PolicyResolutionInconsistent {
            expected: resolved.requested_targets,
            actual: resolved.targets.len(),
        });
    }

    for target in &resolved.targets {
        let allowed = target.evaluate(claims, request)?;
        debug!(location = %target.location(), allowed, "evaluated repository policy");
        if !allowed {
            return Ok(false);
        }
    }

    Ok(true)
}
