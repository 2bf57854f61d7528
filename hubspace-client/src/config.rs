//! Hub connection settings.

use crate::error::{HubError, HubResult};
use hubspace_crypto::{Credential, Identity, resolve_signed_credential, resolve_static_credential};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`HubConfig::api_base_url`].
pub const ENV_API_URL: &str = "HUB_API_URL";
/// Environment variable holding the application key.
pub const ENV_KEY: &str = "HUB_KEY";
/// Environment variable holding the application secret.
pub const ENV_SECRET: &str = "HUB_SECRET";

/// Settings for the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the hub API (e.g. `https://hub.hubspace.io`).
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Lifetime of signed credentials resolved through this config.
    pub token_ttl_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://hub.hubspace.io".to_string(),
            timeout_secs: 30,
            token_ttl_secs: 3600,
            user_agent: format!("hubspace-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HubConfig {
    /// Reads the config and a static credential from the process environment.
    ///
    /// `HUB_KEY` and `HUB_SECRET` are required; `HUB_API_URL` is optional.
    pub fn from_env() -> HubResult<(Self, Credential)> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`HubConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> HubResult<(Self, Credential)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }

        let key = lookup(ENV_KEY)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| HubError::Configuration(format!("{ENV_KEY} is not set")))?;
        let secret = lookup(ENV_SECRET)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| HubError::Configuration(format!("{ENV_SECRET} is not set")))?;

        let credential = resolve_static_credential(&key, &secret)?;
        Ok((config, credential))
    }

    /// Resolves a signed credential for `identity` valid for `token_ttl_secs`.
    pub fn signed_credential(
        &self,
        key: &str,
        secret: &str,
        identity: &Identity,
    ) -> HubResult<Credential> {
        Ok(resolve_signed_credential(key, secret, identity, self.token_ttl())?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Checks the fields the HTTP transport depends on.
    pub fn validate(&self) -> HubResult<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(HubError::Configuration("api_base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HubError::Configuration(format!(
                "api_base_url must be an http(s) URL: {url}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(HubError::Configuration("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
