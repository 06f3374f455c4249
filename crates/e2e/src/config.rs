//! Harness configuration.
//!
//! Loaded from YAML or JSON (picked by file extension), then overridden by
//! environment variables and finally by CLI flags.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the application base URL
pub const ENV_BASE_URL: &str = "CSS_ADAPT_E2E_BASE_URL";

/// Environment variable overriding the fixture directory
pub const ENV_FIXTURES: &str = "CSS_ADAPT_E2E_FIXTURES";

/// Hosted css-adapt instance
pub const DEFAULT_BASE_URL: &str = "https://css-adapt.ai.devgfnl.com/";

/// Default command timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 4000;

/// Default initial polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default polling backoff multiplier
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Largest accepted polling backoff multiplier
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

/// Default polling interval ceiling in milliseconds
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 500;

/// Default bound for interception waits in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Default bound for a whole scenario in milliseconds
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 60_000;

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BrowserOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Disable same-origin enforcement (the hosted app is cross-origin)
    pub relaxed_web_security: bool,
    /// Pass `--no-sandbox` (containers)
    pub no_sandbox: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Explicit chromium executable
    pub chromium_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            relaxed_web_security: true,
            no_sandbox: false,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
        }
    }
}

/// Configuration for a harness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HarnessConfig {
    /// Base URL every `visit` is resolved against
    pub base_url: String,
    /// Directory holding fixture datasets
    pub fixtures_dir: PathBuf,
    /// Timeout for element lookups and assertions
    pub default_timeout_ms: u64,
    /// First polling interval
    pub poll_interval_ms: u64,
    /// Multiplier applied to the interval after each failed attempt
    pub backoff_factor: f64,
    /// Upper bound for the polling interval
    pub max_poll_interval_ms: u64,
    /// Timeout for interception waits
    pub request_timeout_ms: u64,
    /// Overall bound for one scenario
    pub scenario_timeout_ms: u64,
    /// Browser launch options
    pub browser: BrowserOptions,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fixtures_dir: PathBuf::from("fixtures"),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_poll_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            browser: BrowserOptions::default(),
        }
    }
}

impl HarnessConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file; `.yaml`/`.yml` parse as YAML, anything else as JSON
    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&raw)?,
            _ => serde_json::from_str(&raw)?,
        };
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded harness config");
        Ok(config)
    }

    /// Apply `CSS_ADAPT_E2E_*` environment overrides
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (testable without touching the process env)
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(dir) = lookup(ENV_FIXTURES).filter(|v| !v.is_empty()) {
            self.fixtures_dir = PathBuf::from(dir);
        }
        self
    }

    /// Reject values that would make polling degenerate
    pub fn validate(&self) -> HarnessResult<()> {
        if self.base_url.is_empty() {
            return Err(HarnessError::config("base_url must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(HarnessError::config("poll_interval_ms must be positive"));
        }
        if !(1.0..=MAX_BACKOFF_FACTOR).contains(&self.backoff_factor) {
            return Err(HarnessError::config(format!(
                "backoff_factor must be within 1.0..={MAX_BACKOFF_FACTOR}, got {}",
                self.backoff_factor
            )));
        }
        if self.max_poll_interval_ms < self.poll_interval_ms {
            return Err(HarnessError::config(
                "max_poll_interval_ms must not be below poll_interval_ms",
            ));
        }
        Ok(())
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the fixture directory
    #[must_use]
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Set the lookup/assertion timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Set the interception wait timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Set the per-scenario timeout
    #[must_use]
    pub const fn with_scenario_timeout(mut self, ms: u64) -> Self {
        self.scenario_timeout_ms = ms;
        self
    }

    /// Set the initial polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = headless;
        self
    }

    /// Set relaxed web security
    #[must_use]
    pub const fn with_relaxed_web_security(mut self, relaxed: bool) -> Self {
        self.browser.relaxed_web_security = relaxed;
        self
    }

    /// Set the browser options wholesale
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserOptions) -> Self {
        self.browser = browser;
        self
    }

    /// Lookup/assertion timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Interception wait timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Per-scenario timeout
    #[must_use]
    pub const fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    /// Resolve a path against the base URL
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        }
    }
}
