//! Policy resolution
//!
//! Locates the owner policy and the per-repository policies for a request
//! and fetches them concurrently. A missing document is neutral; any other
//! fetch failure fails the whole resolution.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::document::PolicyDocument;
use super::location::PolicyLocation;
use crate::config::RegoConfig;
use crate::error::{ApiError, Result};
use crate::sts::TokenRequest;

/// Fetches raw policy sources
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Rego source at `location`, or `None` when the repository has none
    async fn fetch_policy(&self, location: &PolicyLocation) -> Result<Option<String>>;
}

/// Policies that apply to one request
#[derive(Debug, Default)]
pub struct ResolvedPolicies {
    /// Where the owner policy was looked up, if one is configured
    pub owner_location: Option<PolicyLocation>,
    /// The owner policy, when present
    pub owner: Option<PolicyDocument>,
    /// Target policies that were found
    pub targets: Vec<PolicyDocument>,
    /// Distinct target repositories other than the owner location
    pub requested_targets: usize,
    /// A requested repository is the owner policy repository itself
    pub owner_targeted: bool,
    /// Whether target policies were consulted at all
    pub targets_enabled: bool,
}

pub struct PolicyResolver {
    source: Arc<dyn PolicySource>,
    config: RegoConfig,
}

impl PolicyResolver {
    pub fn new(source: Arc<dyn PolicySource>, config: RegoConfig) -> Self {
        Self { source, config }
    }

    /// Fetch and parse every policy relevant to `request`
    #[tracing::instrument(skip_all, fields(owner = request.owner()))]
    pub async fn resolve(&self, request: &TokenRequest) -> Result<ResolvedPolicies> {
        let owner_location =
            PolicyLocation::owner_location(&self.config.owner_repo, request.owner())?;

        let mut targets: Vec<PolicyLocation> = Vec::new();
        let mut owner_targeted = false;
        for repository in &request.repositories {
            let location = PolicyLocation::parse(repository)?;
            if Some(&location) == owner_location.as_ref() {
                owner_targeted = true;
            } else if !targets.contains(&location) {
                targets.push(location);
            }
        }
        let requested_targets = targets.len();

        // Target policies cannot change the outcome in these cases
        let targets_enabled = self.config.from_repos;
        if !targets_enabled || owner_targeted || request.has_owner_permissions() {
            targets.clear();
        }

        let mut fetches = Vec::with_capacity(targets.len() + 1);
        if let Some(ref location) = owner_location {
            fetches.push(self.fetch(location.clone()));
        }
        fetches.extend(targets.into_iter().map(|location| self.fetch(location)));

        let mut found = try_join_all(fetches).await?.into_iter();

        let owner = match owner_location {
            Some(_) => found.next().flatten(),
            None => None,
        };
        let targets: Vec<PolicyDocument> = found.flatten().collect();

        info!(
            owner_policy = owner.is_some(),
            target_policies = targets.len(),
            requested_targets,
            "resolved policies"
        );

        Ok(ResolvedPolicies {
            owner_location,
            owner,
            targets,
            requested_targets,
            owner_targeted,
            targets_enabled,
        })
    }

    async fn fetch(&self, location: PolicyLocation) -> Result<Option<PolicyDocument>> {
        let source = self
            .source
            .fetch_policy(&location)
            .await
            .map_err(|e| match e {
                ApiError::PolicyFetchFailed { .. } => e,
                other => ApiError::policy_fetch_failed(format!("{}: {}", location, other)),
            })?;

        match source {
            Some(source) => {
                debug!(location = %location, "fetched policy");
                PolicyDocument::compile(location, &source).map(Some)
            }
            None => {
                debug!(location = %location, "no policy found");
                Ok(None)
            }
        }
    }
}
