//! Configuration system (layered: code > env > config file).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::auth::DeviceFlowRequest;
use crate::error::{DevauthError, Result};

pub const DEFAULT_SCOPE: &str = "openid profile email offline_access";
pub const DEFAULT_SLOW_DOWN_SECS: u64 = 5;
pub const DEFAULT_EVICTION_GRACE_SECS: i64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Resolved configuration for one client identity against one authorization server.
///
/// # Example
/// ```
/// use devauth::config::DeviceAuthConfig;
///
/// let config = DeviceAuthConfig::new("https://tenant.example.com/", "client-123");
/// assert_eq!(config.token_url(), "https://tenant.example.com/oauth/token");
/// assert_eq!(config.audience(), "https://tenant.example.com/userinfo");
/// config.validate()?;
/// # Ok::<(), devauth::error::DevauthError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceAuthConfig {
    pub domain: String,
    pub client_id: String,
    pub scope: String,
    audience: Option<String>,
    pub logout_return_to: Option<String>,
    pub http_timeout: StdDuration,
    /// Seconds added to the polling interval on every `slow_down`.
    pub slow_down_increment: u64,
    /// How long a finished or expired flow stays readable before eviction.
    pub eviction_grace: Duration,
    device_code_url: Option<String>,
    token_url: Option<String>,
    userinfo_url: Option<String>,
    logout_url: Option<String>,
}

impl DeviceAuthConfig {
    pub fn new(domain: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            scope: DEFAULT_SCOPE.to_string(),
            audience: None,
            logout_return_to: None,
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            slow_down_increment: DEFAULT_SLOW_DOWN_SECS,
            eviction_grace: Duration::seconds(DEFAULT_EVICTION_GRACE_SECS),
            device_code_url: None,
            token_url: None,
            userinfo_url: None,
            logout_url: None,
        }
    }

    /// Default config file path (`~/.devauth/config.toml`).
    pub fn default_config_path() -> PathBuf {
        default_devauth_dir().join("config.toml")
    }

    /// Load the config file (if any), then overlay `.env` and process environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let file = match path {
            Some(path) => Some(ConfigFile::read(path)?),
            None => ConfigFile::read_optional(&Self::default_config_path())?,
        };
        let mut config = Self::from_file(file.unwrap_or_default())?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Config from process environment only.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::new("", "");
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::new(
            file.domain.unwrap_or_default(),
            file.client_id.unwrap_or_default(),
        );
        if let Some(scope) = file.scope {
            config.scope = scope;
        }
        config.audience = file.audience;
        config.logout_return_to = file.logout_return_to;
        if let Some(secs) = file.http_timeout_secs {
            config.http_timeout = StdDuration::from_secs(secs);
        }
        if let Some(secs) = file.slow_down_secs {
            config.slow_down_increment = secs;
        }
        if let Some(secs) = file.eviction_grace_secs {
            config.eviction_grace = Duration::try_seconds(secs).ok_or_else(|| {
                DevauthError::Configuration(format!(
                    "eviction_grace_secs is out of range, got {secs}"
                ))
            })?;
        }
        config.device_code_url = file.device_code_url;
        config.token_url = file.token_url;
        config.userinfo_url = file.userinfo_url;
        config.logout_url = file.logout_url;
        Ok(config)
    }

    /// Overlay `DEVAUTH_*` variables read through `lookup`.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(domain) = lookup("DEVAUTH_DOMAIN") {
            self.domain = domain;
        }
        if let Some(client_id) = lookup("DEVAUTH_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Some(scope) = lookup("DEVAUTH_SCOPE") {
            self.scope = scope;
        }
        if let Some(audience) = lookup("DEVAUTH_AUDIENCE") {
            self.audience = Some(audience);
        }
        if let Some(return_to) = lookup("DEVAUTH_LOGOUT_RETURN_TO") {
            self.logout_return_to = Some(return_to);
        }
        if let Some(raw) = lookup("DEVAUTH_SLOW_DOWN_SECS") {
            self.slow_down_increment = parse_secs("DEVAUTH_SLOW_DOWN_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DEVAUTH_HTTP_TIMEOUT_SECS") {
            self.http_timeout =
                StdDuration::from_secs(parse_secs("DEVAUTH_HTTP_TIMEOUT_SECS", &raw)?);
        }
        if let Some(url) = lookup("DEVAUTH_DEVICE_CODE_URL") {
            self.device_code_url = Some(url);
        }
        if let Some(url) = lookup("DEVAUTH_TOKEN_URL") {
            self.token_url = Some(url);
        }
        if let Some(url) = lookup("DEVAUTH_USERINFO_URL") {
            self.userinfo_url = Some(url);
        }
        if let Some(url) = lookup("DEVAUTH_LOGOUT_URL") {
            self.logout_url = Some(url);
        }
        Ok(())
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_logout_return_to(mut self, url: impl Into<String>) -> Self {
        self.logout_return_to = Some(url.into());
        self
    }

    pub fn with_slow_down_increment(mut self, secs: u64) -> Self {
        self.slow_down_increment = secs;
        self
    }

    pub fn with_eviction_grace(mut self, grace: Duration) -> Self {
        self.eviction_grace = grace;
        self
    }

    pub fn with_http_timeout(mut self, timeout: StdDuration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = Some(url.into());
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = Some(url.into());
        self
    }

    pub fn with_logout_url(mut self, url: impl Into<String>) -> Self {
        self.logout_url = Some(url.into());
        self
    }

    fn base(&self) -> &str {
        self.domain.trim_end_matches('/')
    }

    pub fn device_code_url(&self) -> String {
        self.device_code_url
            .clone()
            .unwrap_or_else(|| format!("{}/oauth/device/code", self.base()))
    }

    pub fn token_url(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| format!("{}/oauth/token", self.base()))
    }

    pub fn userinfo_url(&self) -> String {
        self.userinfo_url
            .clone()
            .unwrap_or_else(|| format!("{}/userinfo", self.base()))
    }

    /// Requested audience; defaults to the standard userinfo endpoint.
    pub fn audience(&self) -> String {
        self.audience
            .clone()
            .unwrap_or_else(|| format!("{}/userinfo", self.base()))
    }

    /// Authorization-server logout redirect, when a return URL is configured.
    pub fn logout_redirect(&self) -> Option<String> {
        let return_to = self.logout_return_to.as_deref()?;
        let endpoint = self
            .logout_url
            .clone()
            .unwrap_or_else(|| format!("{}/v2/logout", self.base()));
        let url = url::Url::parse_with_params(
            &endpoint,
            &[("client_id", self.client_id.as_str()), ("returnTo", return_to)],
        )
        .ok()?;
        Some(url.to_string())
    }

    /// Request parameters for a new device flow.
    pub fn flow_request(&self) -> DeviceFlowRequest {
        DeviceFlowRequest::builder()
            .client_id(self.client_id.clone())
            .scope(self.scope.clone())
            .audience(self.audience())
            .build()
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(DevauthError::Configuration(
                "client id is not set (DEVAUTH_CLIENT_ID)".to_string(),
            ));
        }
        if self.domain.trim().is_empty() {
            return Err(DevauthError::Configuration(
                "authorization server domain is not set (DEVAUTH_DOMAIN)".to_string(),
            ));
        }
        let parsed = url::Url::parse(&self.domain).map_err(|e| {
            DevauthError::Configuration(format!("invalid domain {}: {e}", self.domain))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DevauthError::Configuration(format!(
                "domain must be an http(s) URL, got {}",
                self.domain
            )));
        }
        if self.eviction_grace < Duration::zero() {
            return Err(DevauthError::Configuration(format!(
                "eviction grace must not be negative, got {}s",
                self.eviction_grace.num_seconds()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    domain: Option<String>,
    client_id: Option<String>,
    scope: Option<String>,
    audience: Option<String>,
    logout_return_to: Option<String>,
    http_timeout_secs: Option<u64>,
    slow_down_secs: Option<u64>,
    eviction_grace_secs: Option<i64>,
    device_code_url: Option<String>,
    token_url: Option<String>,
    userinfo_url: Option<String>,
    logout_url: Option<String>,
}

impl ConfigFile {
    fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    fn read_optional(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(Some(toml::from_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DevauthError::Io(err)),
        }
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| {
        DevauthError::Configuration(format!("{key} must be a whole number of seconds, got {raw:?}"))
    })
}

pub(crate) fn default_devauth_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".devauth"))
        .unwrap_or_else(|| PathBuf::from(".devauth"))
}
