//! GitHub App installation permissions
//!
//! Maps the generic `name -> level` permission map of a token request onto
//! the permission names the installation token API accepts.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A permission an installation token can be scoped to
///
/// Serialized as [`Permission::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Actions,
    Administration,
    Checks,
    Codespaces,
    Contents,
    DependabotSecrets,
    Deployments,
    Environments,
    Issues,
    Metadata,
    Packages,
    Pages,
    PullRequests,
    RepositoryCustomProperties,
    RepositoryHooks,
    RepositoryProjects,
    SecretScanningAlerts,
    Secrets,
    SecurityEvents,
    SingleFile,
    Statuses,
    VulnerabilityAlerts,
    Workflows,
    Members,
    OrganizationAdministration,
    OrganizationAnnouncementBanners,
    OrganizationCopilotSeatManagement,
    OrganizationCustomOrgRoles,
    OrganizationCustomProperties,
    OrganizationCustomRoles,
    OrganizationEvents,
    OrganizationHooks,
    OrganizationPackages,
    OrganizationPersonalAccessTokenRequests,
    OrganizationPersonalAccessTokens,
    OrganizationPlan,
    OrganizationProjects,
    OrganizationSecrets,
    OrganizationSelfHostedRunners,
    OrganizationUserBlocking,
    TeamDiscussions,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Self::Actions,
        Self::Administration,
        Self::Checks,
        Self::Codespaces,
        Self::Contents,
        Self::DependabotSecrets,
        Self::Deployments,
        Self::Environments,
        Self::Issues,
        Self::Metadata,
        Self::Packages,
        Self::Pages,
        Self::PullRequests,
        Self::RepositoryCustomProperties,
        Self::RepositoryHooks,
        Self::RepositoryProjects,
        Self::SecretScanningAlerts,
        Self::Secrets,
        Self::SecurityEvents,
        Self::SingleFile,
        Self::Statuses,
        Self::VulnerabilityAlerts,
        Self::Workflows,
        Self::Members,
        Self::OrganizationAdministration,
        Self::OrganizationAnnouncementBanners,
        Self::OrganizationCopilotSeatManagement,
        Self::OrganizationCustomOrgRoles,
        Self::OrganizationCustomProperties,
        Self::OrganizationCustomRoles,
        Self::OrganizationEvents,
        Self::OrganizationHooks,
        Self::OrganizationPackages,
        Self::OrganizationPersonalAccessTokenRequests,
        Self::OrganizationPersonalAccessTokens,
        Self::OrganizationPlan,
        Self::OrganizationProjects,
        Self::OrganizationSecrets,
        Self::OrganizationSelfHostedRunners,
        Self::OrganizationUserBlocking,
        Self::TeamDiscussions,
    ];

    /// API name of the permission
    pub fn name(self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Administration => "administration",
            Self::Checks => "checks",
            Self::Codespaces => "codespaces",
            Self::Contents => "contents",
            Self::DependabotSecrets => "dependabot_secrets",
            Self::Deployments => "deployments",
            Self::Environments => "environments",
            Self::Issues => "issues",
            Self::Metadata => "metadata",
            Self::Packages => "packages",
            Self::Pages => "pages",
            Self::PullRequests => "pull_requests",
            Self::RepositoryCustomProperties => "repository_custom_properties",
            Self::RepositoryHooks => "repository_hooks",
            Self::RepositoryProjects => "repository_projects",
            Self::SecretScanningAlerts => "secret_scanning_alerts",
            Self::Secrets => "secrets",
            Self::SecurityEvents => "security_events",
            Self::SingleFile => "single_file",
            Self::Statuses => "statuses",
            Self::VulnerabilityAlerts => "vulnerability_alerts",
            Self::Workflows => "workflows",
            Self::Members => "members",
            Self::OrganizationAdministration => "organization_administration",
            Self::OrganizationAnnouncementBanners => "organization_announcement_banners",
            Self::OrganizationCopilotSeatManagement => "organization_copilot_seat_management",
            Self::OrganizationCustomOrgRoles => "organization_custom_org_roles",
            Self::OrganizationCustomProperties => "organization_custom_properties",
            Self::OrganizationCustomRoles => "organization_custom_roles",
            Self::OrganizationEvents => "organization_events",
            Self::OrganizationHooks => "organization_hooks",
            Self::OrganizationPackages => "organization_packages",
            Self::OrganizationPersonalAccessTokenRequests => {
                "organization_personal_access_token_requests"
            }
            Self::OrganizationPersonalAccessTokens => "organization_personal_access_tokens",
            Self::OrganizationPlan => "organization_plan",
            Self::OrganizationProjects => "organization_projects",
            Self::OrganizationSecrets => "organization_secrets",
            Self::OrganizationSelfHostedRunners => "organization_self_hosted_runners",
            Self::OrganizationUserBlocking => "organization_user_blocking",
            Self::TeamDiscussions => "team_discussions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Whether the permission acts on the whole owner rather than one repository
    ///
    /// Only the owner policy may grant these.
    pub fn is_owner_level(self) -> bool {
        matches!(
            self,
            Self::Members
                | Self::OrganizationAdministration
                | Self::OrganizationAnnouncementBanners
                | Self::OrganizationCopilotSeatManagement
                | Self::OrganizationCustomOrgRoles
                | Self::OrganizationCustomProperties
                | Self::OrganizationCustomRoles
                | Self::OrganizationEvents
                | Self::OrganizationHooks
                | Self::OrganizationPackages
                | Self::OrganizationPersonalAccessTokenRequests
                | Self::OrganizationPersonalAccessTokens
                | Self::OrganizationPlan
                | Self::OrganizationProjects
                | Self::OrganizationSecrets
                | Self::OrganizationSelfHostedRunners
                | Self::OrganizationUserBlocking
                | Self::TeamDiscussions
        )
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Permission body of an installation token request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InstallationPermissions(BTreeMap<Permission, String>);

impl InstallationPermissions {
    /// Translate a generic permission map
    ///
    /// Returns the recognized permissions and the names that were dropped.
    pub fn from_request(permissions: &BTreeMap<String, String>) -> (Self, Vec<String>) {
        let mut recognized = BTreeMap::new();
        let mut dropped = Vec::new();
        for (name, level) in permissions {
            match Permission::from_name(name) {
                Some(permission) => {
                    recognized.insert(permission, level.clone());
                }
                None => dropped.push(name.clone()),
            }
        }
        (Self(recognized), dropped)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
