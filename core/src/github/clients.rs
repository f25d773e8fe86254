//! Per-owner GitHub App installations
//!
//! Installations are looked up lazily on first use and kept for the life of
//! the process. Concurrent first requests for the same owner may each do the
//! lookup, but only one binding is ever stored and every caller gets it.
//! Policy read tokens are minted once per installation; concurrent callers
//! wait on the installation's refresh lock and share the result.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::api::get_file_content;
use super::auth::{AppClient, PemJwtSigner};
use super::permissions::InstallationPermissions;
use crate::config::{AppConfig, DEFAULT_APP_KEY};
use crate::error::{ApiError, Result};
use crate::platform::{Clock, HttpClient};
use crate::policy::{PolicyLocation, PolicySource, POLICY_PATH};

/// Refresh cached installation tokens this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// GitHub App installations keyed by repository owner
pub struct Clients {
    apps: HashMap<String, AppConfig>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    installations: DashMap<String, Arc<Installation>>,
}

impl Clients {
    pub fn new(
        apps: HashMap<String, AppConfig>,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            apps,
            http,
            clock,
            installations: DashMap::new(),
        }
    }

    /// App configuration for `owner`, falling back to the default entry
    fn app_config(&self, owner: &str) -> Result<&AppConfig> {
        self.apps
            .get(owner)
            .or_else(|| self.apps.get(DEFAULT_APP_KEY))
            .ok_or_else(|| ApiError::no_tenant_config(owner))
    }

    /// Installation binding for `owner`
    pub async fn installation(&self, owner: &str) -> Result<Arc<Installation>> {
        if let Some(existing) = self.installations.get(owner).map(|e| e.value().clone()) {
            return Ok(existing);
        }

        let config = self.app_config(owner)?;
        let signer = PemJwtSigner {
            app_id: config.app_id.to_string(),
            pem_key: config.private_key_pem()?,
        };
        let app = AppClient::new(Arc::new(signer), self.http.clone(), self.clock.clone());
        let installation_id = app.find_installation(owner).await?;
        info!(owner, app_id = config.app_id, installation_id, "found installation");

        let created = Arc::new(Installation {
            owner: owner.to_string(),
            app,
            installation_id,
            clock: self.clock.clone(),
            read_token: Mutex::new(None),
        });

        let stored = self
            .installations
            .entry(owner.to_string())
            .or_insert(created)
            .value()
            .clone();
        Ok(stored)
    }
}

#[async_trait]
impl PolicySource for Clients {
    async fn fetch_policy(&self, location: &PolicyLocation) -> Result<Option<String>> {
        let installation = self.installation(&location.owner).await?;
        let token = installation.read_token().await?;
        get_file_content(
            &location.owner,
            &location.repo,
            POLICY_PATH,
            &token,
            self.http.as_ref(),
        )
        .await
    }
}

struct CachedToken {
    token: String,
    expires_at_secs: u64,
}

/// An app installation for one owner
pub struct Installation {
    owner: String,
    app: AppClient,
    installation_id: u64,
    clock: Arc<dyn Clock>,
    read_token: Mutex<Option<CachedToken>>,
}

impl Installation {
    pub fn installation_id(&self) -> u64 {
        self.installation_id
    }

    pub fn app(&self) -> &AppClient {
        &self.app
    }

    /// Installation token with read access to repository contents
    ///
    /// Cached until shortly before it expires. The lock is held while
    /// minting so concurrent callers never mint more than one token.
    pub async fn read_token(&self) -> Result<String> {
        let mut cached = self.read_token.lock().await;
        let now_secs = self.clock.now_secs();
        if let Some(token) = cached
            .as_ref()
            .filter(|t| t.expires_at_secs > now_secs + TOKEN_REFRESH_MARGIN_SECS)
        {
            return Ok(token.token.clone());
        }

        let permissions: BTreeMap<String, String> =
            [("contents".to_string(), "read".to_string())].into_iter().collect();
        let (permissions, _) = InstallationPermissions::from_request(&permissions);
        let minted = self
            .app
            .create_installation_token(self.installation_id, &[], &permissions)
            .await?;
        debug!(owner = %self.owner, expires_at = %minted.expires_at, "minted policy read token");

        let expires_at_secs = now_secs + seconds_until(&minted.expires_at, now_secs as i64).unwrap_or(0);
        *cached = Some(CachedToken {
            token: minted.token.clone(),
            expires_at_secs,
        });
        Ok(minted.token)
    }
}

/// Seconds from `now_secs` until an RFC 3339 `expires_at`
///
/// `None` when the timestamp is unparseable or already past.
pub fn seconds_until(expires_at: &str, now_secs: i64) -> Option<u64> {
    use chrono::{DateTime, Utc};

    let expires_dt: DateTime<Utc> = expires_at.parse().ok()?;
    let diff = expires_dt.timestamp() - now_secs;

    if diff > 0 {
        Some(diff as u64)
    } else {
        None
    }
}
