//! Configuration loading and management.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use te_api::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use te_core::LookbackWindow;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Toggl Track API token.
    pub api_token: Option<String>,
    /// API root, overridable for testing against a local server.
    pub api_base_url: String,
    /// Address the `/metrics` endpoint listens on.
    pub listen_addr: SocketAddr,
    /// Seconds between scrape cycles.
    pub scrape_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Lookback windows, in hours, aggregated every cycle.
    pub lookback_hours: Vec<LookbackWindow>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_base_url", &self.api_base_url)
            .field("listen_addr", &self.listen_addr)
            .field("scrape_interval_secs", &self.scrape_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("lookback_hours", &self.lookback_hours)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            scrape_interval_secs: 60,
            request_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            lookback_hours: [1, 24, 168]
                .into_iter()
                .filter_map(|hours| LookbackWindow::new(hours).ok())
                .collect(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TOGGL_*)
        figment = figment.merge(Env::prefixed("TOGGL_"));

        let mut config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    fn validate(&mut self) -> Result<(), figment::Error> {
        if self.scrape_interval_secs == 0 {
            return Err(figment::Error::from(
                "scrape_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(figment::Error::from(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut unique = Vec::with_capacity(self.lookback_hours.len());
        for window in &self.lookback_hours {
            if unique.contains(window) {
                tracing::warn!(%window, "ignoring duplicate lookback window");
            } else {
                unique.push(*window);
            }
        }
        self.lookback_hours = unique;
        Ok(())
    }

    /// The configured token, trimmed, if non-empty.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub const fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns the platform-specific config directory for the exporter.
///
/// On Linux: `~/.config/toggl-exporter`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("toggl-exporter"))
}
