//! Browser engine configuration types.
//!
//! These types live outside `#[cfg(feature = "browser")]` so configuration
//! parsing works in builds without browser support.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default user agent for rendering sessions.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// How rendering sessions map onto browser processes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrowserEngineMode {
    /// Launch a fresh browser process for every session.
    #[default]
    PerRequest,

    /// Keep one warm browser process; each session gets its own browser context.
    Shared,
}

impl BrowserEngineMode {
    /// Parse from string (for CLI/env var).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "perrequest" => Some(Self::PerRequest),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

impl std::fmt::Display for BrowserEngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerRequest => write!(f, "per_request"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserEngineConfig {
    /// Process model for sessions.
    #[serde(default)]
    pub mode: BrowserEngineMode,

    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    /// Only meaningful in shared mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// User agent sent by rendering sessions.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            mode: BrowserEngineMode::default(),
            headless: default_headless(),
            chrome_path: None,
            proxy: None,
            chrome_args: Vec::new(),
            remote_url: None,
            user_agent: default_user_agent(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply overrides from a variable lookup.
    ///
    /// - `BROWSER_URL` - Remote Chrome DevTools URL (implies shared mode)
    /// - `WIKISCRAPE_BROWSER_MODE` - per_request or shared
    /// - `CHROME_PATH` - Chrome executable
    /// - `SOCKS_PROXY` - proxy for browser traffic, if none is configured
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("WIKISCRAPE_BROWSER_MODE") {
            if let Some(mode) = BrowserEngineMode::parse(&val) {
                self.mode = mode;
            }
        }

        if let Some(val) = lookup("BROWSER_URL").filter(|v| !v.is_empty()) {
            self.remote_url = Some(val);
            self.mode = BrowserEngineMode::Shared;
        }

        if let Some(val) = lookup("CHROME_PATH").filter(|v| !v.is_empty()) {
            self.chrome_path = Some(PathBuf::from(val));
        }

        if self.proxy.is_none() {
            if let Some(val) = lookup("SOCKS_PROXY").filter(|v| !v.is_empty()) {
                self.proxy = Some(val);
            }
        }

        self
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
