//! Token request parsing and validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ApiError, Result};
use crate::github::permissions::Permission;

/// A workflow's request for a scoped installation token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Fully-qualified `owner/name` repositories
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Permission name to access level (`read`, `write`, ...)
    #[serde(default)]
    pub permissions: BTreeMap<String, String>,
}

impl TokenRequest {
    /// Parse and validate a JSON request body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| ApiError::invalid_request(format!("invalid request body: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    /// Check the request is well-formed and targets a single owner
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(ApiError::invalid_request("repositories cannot be empty"));
        }
        if self.permissions.is_empty() {
            return Err(ApiError::invalid_request("permissions cannot be empty"));
        }

        let mut owner: Option<&str> = None;
        for repository in &self.repositories {
            let (repo_owner, _) = split_repository(repository)?;
            match owner {
                None => owner = Some(repo_owner),
                Some(o) if o == repo_owner => {}
                Some(o) => {
                    return Err(ApiError::invalid_request(format!(
                        "repositories span multiple owners ('{}' and '{}')",
                        o, repo_owner
                    )))
                }
            }
        }
        Ok(())
    }

    /// Owner of the requested repositories, taken from the first entry
    pub fn owner(&self) -> &str {
        self.repositories
            .first()
            .and_then(|r| r.split_once('/'))
            .map(|(owner, _)| owner)
            .unwrap_or_default()
    }

    /// Repository names with the owner prefix stripped
    pub fn repository_names(&self) -> Vec<String> {
        self.repositories
            .iter()
            .map(|r| match r.split_once('/') {
                Some((_, name)) => name.to_string(),
                None => r.clone(),
            })
            .collect()
    }

    /// Whether any requested permission applies to the owner as a whole
    pub fn has_owner_permissions(&self) -> bool {
        self.permissions
            .keys()
            .filter_map(|name| Permission::from_name(name))
            .any(Permission::is_owner_level)
    }
}

fn split_repository(repository: &str) -> Result<(&str, &str)> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(ApiError::invalid_request(format!(
            "repository '{}' must be in format owner/repo",
            repository
        ))),
    }
}
