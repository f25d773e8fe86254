//! GitHub API module
//!
//! Handles GitHub App authentication, installations and content fetches.

pub mod api;
pub mod auth;
pub mod clients;
pub mod permissions;

pub use auth::{AppClient, InstallationToken, PemJwtSigner};
pub use clients::{Clients, Installation};
pub use permissions::{InstallationPermissions, Permission};

pub(crate) const GITHUB_API_BASE: &str = "https://api.github.com";

pub(crate) const GITHUB_API_VERSION: &str = "2022-11-28";

pub(crate) const USER_AGENT: &str = "gtfo";
