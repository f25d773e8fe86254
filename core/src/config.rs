//! Configuration loading
//!
//! Configuration comes from an optional YAML file (`gtfo.yaml` in the working
//! directory, or the path in `GTFO_CONFIG`) with environment overrides on top.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ApiError, Result};
use crate::platform::Environment;

/// Default listen address
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// GitHub Actions OIDC issuer
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Default owner policy repository
pub const DEFAULT_OWNER_REPO: &str = ".github";

/// Config key for the app used when an owner has no entry of its own
pub const DEFAULT_APP_KEY: &str = "*";

/// Config file used when `GTFO_CONFIG` is not set
const DEFAULT_CONFIG_PATH: &str = "gtfo.yaml";

/// Cache TTL for issuer JWKS documents (1 hour)
pub const JWKS_CACHE_TTL_SECS: u64 = 3600;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address for the HTTP server
    pub addr: String,
    /// Trusted OIDC issuers
    pub issuers: Vec<String>,
    /// Required audience, when set
    pub audience: Option<String>,
    /// Authorization checker settings
    pub checker: CheckerConfig,
    /// GitHub App per repository owner; `*` is the fallback
    pub github: HashMap<String, AppConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            issuers: vec![GITHUB_ACTIONS_ISSUER.to_string()],
            audience: None,
            checker: CheckerConfig::default(),
            github: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub rego: RegoConfig,
}

/// Where Rego policies are loaded from
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegoConfig {
    /// Repository holding the authoritative owner policy, either a bare name
    /// combined with the request owner or a fully-qualified `owner/name`.
    /// Empty disables the owner policy.
    pub owner_repo: String,
    /// Consult `.github/tokens.rego` in every requested repository
    pub from_repos: bool,
}

impl Default for RegoConfig {
    fn default() -> Self {
        Self {
            owner_repo: DEFAULT_OWNER_REPO.to_string(),
            from_repos: false,
        }
    }
}

/// GitHub App credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_id: u64,
    #[serde(default)]
    pub private_key_path: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl AppConfig {
    /// Load the PEM private key, inline or from disk
    pub fn private_key_pem(&self) -> Result<String> {
        if let Some(ref pem) = self.private_key {
            return Ok(pem.clone());
        }
        let path = self.private_key_path.as_ref().ok_or_else(|| {
            ApiError::internal(format!(
                "GitHub App {} has neither private_key nor private_key_path",
                self.app_id
            ))
        })?;
        std::fs::read_to_string(path).map_err(|e| {
            ApiError::internal(format!("failed to read private key '{}': {}", path, e))
        })
    }
}

impl Config {
    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ApiError::internal(format!("invalid configuration: {}", e)))
    }

    /// Load configuration from the config file and environment
    pub fn load(env: &dyn Environment) -> Result<Self> {
        let explicit_path = env.get_var("GTFO_CONFIG").ok();
        let path = explicit_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let yaml = std::fs::read_to_string(&path).map_err(|e| {
                ApiError::internal(format!("failed to read config '{}': {}", path, e))
            })?;
            Self::from_yaml(&yaml)?
        } else if explicit_path.is_some() {
            return Err(ApiError::internal(format!("config file '{}' not found", path)));
        } else {
            Self::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self, env: &dyn Environment) -> Result<()> {
        if let Ok(addr) = env.get_var("GTFO_ADDR") {
            self.addr = addr;
        }
        if let Ok(issuers) = env.get_var("GTFO_ISSUERS") {
            self.issuers = issuers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(audience) = env.get_var("GTFO_AUDIENCE") {
            self.audience = Some(audience);
        }
        if let Ok(owner_repo) = env.get_var("GTFO_OWNER_REPO") {
            self.checker.rego.owner_repo = owner_repo;
        }
        if let Ok(from_repos) = env.get_var("GTFO_FROM_REPOS") {
            self.checker.rego.from_repos = parse_bool(&from_repos)?;
        }

        if let Ok(app_id) = env.get_var("GITHUB_APP_ID") {
            let app_id = app_id
                .trim()
                .parse::<u64>()
                .map_err(|_| ApiError::internal("GITHUB_APP_ID must be a number"))?;
            let app = AppConfig {
                app_id,
                private_key_path: env.get_var("GITHUB_APP_PRIVATE_KEY_PATH").ok(),
                private_key: env.get_secret("GITHUB_APP_PRIVATE_KEY").ok(),
            };
            self.github.insert(DEFAULT_APP_KEY.to_string(), app);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.issuers.is_empty() {
            return Err(ApiError::internal("no trusted issuers configured"));
        }
        if self.github.is_empty() {
            return Err(ApiError::internal("no GitHub App configured"));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ApiError::internal(format!("invalid boolean '{}'", other))),
    }
}
