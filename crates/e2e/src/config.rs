//! Suite configuration: target, credentials, timeouts and browser settings

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};

pub const DEFAULT_BASE_URL: &str = "https://makhaana-ecommerce.vercel.app";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@makhaana.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Admin@123";

/// Top-level configuration shared by every scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    /// Base URL of the deployed storefront, without trailing slash
    pub base_url: String,

    /// Admin login used by the admin journey
    pub admin: Credentials,

    /// Per-step wait bounds
    pub timeouts: TimeoutPolicy,

    /// Browser settings
    pub playwright: PlaywrightConfig,

    /// Reachability check before the first scenario
    pub preflight: PreflightConfig,

    /// Output directory for results and failure screenshots
    pub output_dir: PathBuf,

    /// Upper bound on concurrently running scenarios
    pub max_parallel: usize,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            admin: Credentials::default(),
            timeouts: TimeoutPolicy::default(),
            playwright: PlaywrightConfig::default(),
            preflight: PreflightConfig::default(),
            output_dir: PathBuf::from("test-results"),
            max_parallel: 2,
        }
    }
}

impl E2eConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> E2eResult<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then overlay the process environment
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MAKHAANA_BASE_URL") {
            self.base_url = url;
        }
        if let Some(email) = lookup("ADMIN_EMAIL") {
            self.admin.email = email;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(browser) = lookup("MAKHAANA_BROWSER") {
            self.playwright.browser = Browser::parse(&browser);
        }
        if let Some(headed) = lookup("MAKHAANA_HEADED") {
            self.playwright.headless = !matches!(headed.as_str(), "1" | "true" | "yes");
        }
        self.base_url = normalize_base_url(&self.base_url);
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::InvalidConfig(format!(
                "base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.admin.email.is_empty() || self.admin.password.is_empty() {
            return Err(E2eError::InvalidConfig(
                "admin credentials must not be empty".to_string(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(E2eError::InvalidConfig("max_parallel must be >= 1".to_string()));
        }
        self.timeouts.validate()
    }

    /// Absolute URL for an application path such as `/shop`
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Login credential pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Wait bounds, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    /// Default for clicks, fills and visibility expectations
    pub action_ms: u64,

    /// Page navigations
    pub navigation_ms: u64,

    /// Post-login redirect to the admin dashboard
    pub admin_redirect_ms: u64,

    /// Product page loading spinner to disappear
    pub spinner_hidden_ms: u64,

    /// Payment provider iframe to attach after checkout
    pub payment_iframe_ms: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            action_ms: 5_000,
            navigation_ms: 30_000,
            admin_redirect_ms: 20_000,
            spinner_hidden_ms: 30_000,
            payment_iframe_ms: 15_000,
        }
    }
}

impl TimeoutPolicy {
    fn validate(&self) -> E2eResult<()> {
        let bounds = [
            ("action_ms", self.action_ms),
            ("navigation_ms", self.navigation_ms),
            ("admin_redirect_ms", self.admin_redirect_ms),
            ("spinner_hidden_ms", self.spinner_hidden_ms),
            ("payment_iframe_ms", self.payment_iframe_ms),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(E2eError::InvalidConfig(format!("timeouts.{} must be > 0", name)));
            }
        }
        Ok(())
    }
}

/// Reachability probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreflightConfig {
    pub enabled: bool,
    pub attempts: usize,
    pub interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attempts: 5,
            interval_ms: 1_000,
            request_timeout_ms: 10_000,
        }
    }
}
