//! Configuration management for wikiscrape.
//!
//! Settings come from a TOML file (explicit path, `./wikiscrape.toml`, or
//! `<config dir>/wikiscrape/config.toml`) and are then overlaid with
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use crate::scrapers::browser::{BrowserEngineConfig, BrowserEngineMode};
use crate::scrapers::ExtractionRules;

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default port when a bind address omits one.
pub const DEFAULT_PORT: u16 = 3000;

/// Config file basename looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "wikiscrape.toml";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// `PORT`, `HOST` or `HOST:PORT`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Request validation and session limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeConfig {
    /// Hosts that may be scraped (suffix match). Empty disables the check.
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Navigation deadline in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: u64,

    /// Deadline in seconds for reading the rendered document. 0 disables it.
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout: u64,

    /// Maximum concurrent rendering sessions. 0 means unbounded.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            allowed_domains: default_allowed_domains(),
            navigation_timeout: default_navigation_timeout(),
            extraction_timeout: default_extraction_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl ScrapeConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout)
    }

    pub fn extraction_timeout(&self) -> Option<Duration> {
        (self.extraction_timeout > 0).then(|| Duration::from_secs(self.extraction_timeout))
    }
}

fn default_allowed_domains() -> Vec<String> {
    vec!["wikipedia.org".to_string()]
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_extraction_timeout() -> u64 {
    30
}

fn default_max_sessions() -> usize {
    4
}

/// Selectors and patterns for document validation and extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractConfig {
    /// Any of these marks the page as an article.
    #[serde(default = "default_content_markers")]
    pub content_markers: Vec<String>,

    /// Headings containing this are skipped.
    #[serde(default = "default_edit_control")]
    pub edit_control: String,

    /// Paragraphs inside this are skipped.
    #[serde(default = "default_infobox")]
    pub infobox: String,

    /// Headings whose cleaned text matches this (case-insensitive) are skipped.
    #[serde(default = "default_toc_pattern")]
    pub toc_pattern: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            content_markers: default_content_markers(),
            edit_control: default_edit_control(),
            infobox: default_infobox(),
            toc_pattern: default_toc_pattern(),
        }
    }
}

fn default_content_markers() -> Vec<String> {
    vec!["#content".to_string(), ".mw-parser-output".to_string()]
}

fn default_edit_control() -> String {
    ".mw-editsection".to_string()
}

fn default_infobox() -> String {
    ".infobox, .infobox_v2, .infobox_v3".to_string()
}

fn default_toc_pattern() -> String {
    "^(sommaire|contents|table of contents|table des matières)$".to_string()
}

/// Complete application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Load settings from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load, apply environment overrides and validate.
    ///
    /// Returns the settings and the file they came from, if any.
    pub fn load(options: &LoadOptions) -> Result<(Self, Option<PathBuf>)> {
        let path = match options.config_path {
            Some(ref explicit) => Some(explicit.clone()),
            None => find_config_file(),
        };

        let settings = match path {
            Some(ref p) => {
                tracing::debug!("Loading config from {}", p.display());
                Self::from_file(p)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        let settings = settings.with_env_overrides();
        settings.validate()?;
        Ok((settings, path))
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// - `WIKISCRAPE_BIND` - server bind address
    /// - `WIKISCRAPE_ALLOWED_DOMAINS` - comma-separated allowlist, empty disables
    /// - `WIKISCRAPE_NAVIGATION_TIMEOUT` / `WIKISCRAPE_EXTRACTION_TIMEOUT` - seconds
    /// - `WIKISCRAPE_MAX_SESSIONS` - concurrent session limit
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("WIKISCRAPE_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = val;
        }

        if let Some(val) = lookup("WIKISCRAPE_ALLOWED_DOMAINS") {
            self.scrape.allowed_domains = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(secs) = lookup("WIKISCRAPE_NAVIGATION_TIMEOUT").and_then(|v| parse_number(&v)) {
            self.scrape.navigation_timeout = secs;
        }

        if let Some(secs) = lookup("WIKISCRAPE_EXTRACTION_TIMEOUT").and_then(|v| parse_number(&v)) {
            self.scrape.extraction_timeout = secs;
        }

        if let Some(max) = lookup("WIKISCRAPE_MAX_SESSIONS").and_then(|v| parse_number(&v)) {
            self.scrape.max_sessions = max as usize;
        }

        self.browser = self.browser.with_overrides_from(&lookup);
        self
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scrape.navigation_timeout == 0 {
            anyhow::bail!("scrape.navigation_timeout must be greater than zero");
        }
        ExtractionRules::from_config(&self.extract)?;
        Ok(())
    }

    /// Render as TOML for display.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

fn parse_number(value: &str) -> Option<u64> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring non-numeric override value '{}'", value);
            None
        }
    }
}

/// Look for a config file in the working directory, then the user config dir.
fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("wikiscrape").join("config.toml"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "127.0.0.1:3000");
        assert_eq!(settings.scrape.allowed_domains, vec!["wikipedia.org"]);
        assert_eq!(settings.scrape.navigation_timeout(), Duration::from_secs(30));
        assert_eq!(settings.browser.mode, BrowserEngineMode::PerRequest);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [scrape]
            allowed_domains = ["wikipedia.org", "wikimedia.org"]
            navigation_timeout = 10

            [browser]
            mode = "shared"
            "#,
        )
        .unwrap();

        assert_eq!(settings.scrape.allowed_domains.len(), 2);
        assert_eq!(settings.scrape.navigation_timeout, 10);
        assert_eq!(settings.scrape.max_sessions, 4);
        assert_eq!(settings.browser.mode, BrowserEngineMode::Shared);
        assert!(settings.browser.headless);
        assert_eq!(settings.extract, ExtractConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"0.0.0.0:8080\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_with_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scrape]\nmax_sessions = 9").unwrap();

        let options = LoadOptions {
            config_path: Some(file.path().to_path_buf()),
        };
        let (settings, path) = Settings::load(&options).unwrap();
        assert_eq!(path.as_deref(), Some(file.path()));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        assert!(Settings::from_toml("[browser]\nmode = \"pooled\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default().with_overrides_from(lookup(&[
            ("WIKISCRAPE_BIND", "8081"),
            ("WIKISCRAPE_ALLOWED_DOMAINS", "fr.wikipedia.org, en.wikipedia.org"),
            ("WIKISCRAPE_NAVIGATION_TIMEOUT", "12"),
            ("WIKISCRAPE_EXTRACTION_TIMEOUT", "0"),
            ("WIKISCRAPE_MAX_SESSIONS", "2"),
        ]));

        assert_eq!(settings.server.bind, "8081");
        assert_eq!(
            settings.scrape.allowed_domains,
            vec!["fr.wikipedia.org", "en.wikipedia.org"]
        );
        assert_eq!(settings.scrape.navigation_timeout, 12);
        assert_eq!(settings.scrape.extraction_timeout(), None);
        assert_eq!(settings.scrape.max_sessions, 2);
    }

    #[test]
    fn test_empty_allowlist_override_disables_domain_check() {
        let settings =
            Settings::default().with_overrides_from(lookup(&[("WIKISCRAPE_ALLOWED_DOMAINS", "")]));
        assert!(settings.scrape.allowed_domains.is_empty());
    }

    #[test]
    fn test_bad_numeric_override_is_ignored() {
        let settings = Settings::default()
            .with_overrides_from(lookup(&[("WIKISCRAPE_NAVIGATION_TIMEOUT", "soon")]));
        assert_eq!(settings.scrape.navigation_timeout, 30);
    }

    #[test]
    fn test_validate_rejects_zero_navigation_timeout() {
        let mut settings = Settings::default();
        settings.scrape.navigation_timeout = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_selector() {
        let mut settings = Settings::default();
        settings.extract.edit_control = ">>".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), settings);
    }
}
