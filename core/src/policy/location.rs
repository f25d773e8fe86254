//! Policy locations
//!
//! Every policy lives at a well-known path inside a repository.

use std::fmt;

use crate::error::{ApiError, Result};

/// Path of the policy document inside a repository
pub const POLICY_PATH: &str = ".github/tokens.rego";

/// A repository that may hold a policy document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyLocation {
    pub owner: String,
    pub repo: String,
}

impl PolicyLocation {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse an `owner/repo` name
    pub fn parse(full_name: &str) -> Result<Self> {
        let parts: Vec<&str> = full_name.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self::new(*owner, *repo)),
            _ => Err(ApiError::invalid_request(format!(
                "'{}' must be in format owner/repo",
                full_name
            ))),
        }
    }

    /// Location of the owner policy for a request
    ///
    /// `owner_repo` is either a bare repository name, combined with the
    /// request owner, or a fully-qualified `owner/name`. Empty means no
    /// owner policy is configured.
    pub fn owner_location(owner_repo: &str, request_owner: &str) -> Result<Option<Self>> {
        if owner_repo.is_empty() {
            return Ok(None);
        }
        if owner_repo.contains('/') {
            return Self::parse(owner_repo)
                .map(Some)
                .map_err(|_| ApiError::internal(format!("invalid owner policy repository '{}'", owner_repo)));
        }
        Ok(Some(Self::new(request_owner, owner_repo)))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for PolicyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_repo() {
        let location = PolicyLocation::parse("acme/app").unwrap();
        assert_eq!(location.owner, "acme");
        assert_eq!(location.repo, "app");
        assert_eq!(location.full_name(), "acme/app");
        assert_eq!(location.to_string(), "acme/app");
    }

    #[test]
    fn test_parse_too_many_parts() {
        assert!(PolicyLocation::parse("a/b/c").is_err());
        assert!(PolicyLocation::parse("acme").is_err());
        assert!(PolicyLocation::parse("acme/").is_err());
    }

    #[test]
    fn test_owner_location_bare_name() {
        let location = PolicyLocation::owner_location(".github", "acme").unwrap();
        assert_eq!(location, Some(PolicyLocation::new("acme", ".github")));
    }

    #[test]
    fn test_owner_location_fully_qualified() {
        let location = PolicyLocation::owner_location("security/policies", "acme").unwrap();
        assert_eq!(location, Some(PolicyLocation::new("security", "policies")));
    }

    #[test]
    fn test_owner_location_disabled() {
        assert_eq!(PolicyLocation::owner_location("", "acme").unwrap(), None);
    }

    #[test]
    fn test_owner_location_invalid() {
        let err = PolicyLocation::owner_location("a/b/c", "acme").unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
