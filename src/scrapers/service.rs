//! The scrape pipeline: validate, render, check shape, extract.

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::browser::{RenderEngine, RenderSession};
use super::error::ScrapeError;
use super::extract::ExtractionRules;
use super::types::{ScrapeOptions, ScrapeRequest, ScrapeResult};
use crate::config::{ScrapeConfig, Settings};

/// Default deadline for tearing down a rendering session.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Limits and validation policy for scrapes. Immutable after startup.
#[derive(Debug, Clone)]
pub struct ScrapePolicy {
    /// Allowed host suffixes. Empty disables the domain check.
    pub allowed_domains: Vec<String>,
    pub navigation_timeout: Duration,
    pub extraction_timeout: Option<Duration>,
    /// Concurrent session limit, 0 for unbounded.
    pub max_sessions: usize,
    /// Teardown deadline. A session still closing after it is abandoned.
    pub close_timeout: Duration,
}

impl Default for ScrapePolicy {
    fn default() -> Self {
        Self::from(&ScrapeConfig::default())
    }
}

impl From<&ScrapeConfig> for ScrapePolicy {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            navigation_timeout: config.navigation_timeout(),
            extraction_timeout: config.extraction_timeout(),
            max_sessions: config.max_sessions,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl ScrapePolicy {
    /// Whether `host` equals or is a subdomain of an allowed domain.
    pub fn allows_host(&self, host: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let host = host.trim_end_matches('.').to_lowercase();
        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Stateless scrape service shared by all requests.
pub struct ScrapeService {
    engine: Arc<dyn RenderEngine>,
    rules: Arc<ExtractionRules>,
    policy: ScrapePolicy,
    permits: Option<Arc<Semaphore>>,
}

impl ScrapeService {
    pub fn new(engine: Arc<dyn RenderEngine>, rules: ExtractionRules, policy: ScrapePolicy) -> Self {
        let permits = (policy.max_sessions > 0).then(|| Arc::new(Semaphore::new(policy.max_sessions)));
        Self {
            engine,
            rules: Arc::new(rules),
            policy,
            permits,
        }
    }

    /// Build the service from loaded settings.
    pub fn from_settings(settings: &Settings, engine: Arc<dyn RenderEngine>) -> anyhow::Result<Self> {
        let rules = ExtractionRules::from_config(&settings.extract)?;
        Ok(Self::new(engine, rules, ScrapePolicy::from(&settings.scrape)))
    }

    pub fn policy(&self) -> &ScrapePolicy {
        &self.policy
    }

    pub fn engine(&self) -> &Arc<dyn RenderEngine> {
        &self.engine
    }

    /// Check the target URL without touching the rendering engine.
    pub fn validate_url(&self, raw: &str) -> Result<Url, ScrapeError> {
        if raw.is_empty() || !(raw.starts_with("http://") || raw.starts_with("https://")) {
            return Err(ScrapeError::InvalidUrl);
        }

        let url = Url::parse(raw).map_err(|e| {
            debug!("Rejecting unparseable URL {}: {}", raw, e);
            ScrapeError::InvalidUrl
        })?;
        let host = url.host_str().ok_or(ScrapeError::InvalidUrl)?;

        if !self.policy.allows_host(host) {
            return Err(ScrapeError::UnsupportedDomain {
                host: host.to_string(),
                allowed: self.policy.allowed_domains.join(", "),
            });
        }

        Ok(url)
    }

    /// Run one scrape. The rendering session is released on every path.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
        let url = self.validate_url(&request.url)?;

        info!(
            "Scraping {} (headings={}, paragraphs={})",
            url, request.options.headings, request.options.paragraphs
        );

        let permit = match self.permits {
            Some(ref permits) => Some(
                permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ScrapeError::internal(e.into()))?,
            ),
            None => None,
        };

        let mut session = self
            .engine
            .open_session()
            .await
            .map_err(ScrapeError::internal)?;

        let rendered = self.render(session.as_mut(), url.as_str()).await;
        self.close_session(session, &url).await;
        drop(permit);

        let result = self.extract_document(rendered?, request.options).await?;

        if request.options.all_enabled() && result.is_empty() {
            return Err(ScrapeError::NoDataExtracted);
        }

        info!(
            "Scraped {}: {} headings, {} paragraphs",
            url,
            result.headings.len(),
            result.paragraphs.len()
        );

        Ok(result)
    }

    /// Navigate and read back the rendered document.
    async fn render(&self, session: &mut dyn RenderSession, url: &str) -> Result<String, ScrapeError> {
        let deadline = self.policy.navigation_timeout;
        match tokio::time::timeout(deadline, session.navigate(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Navigation to {} failed: {:#}", url, e);
                return Err(ScrapeError::NavigationTimeout(deadline));
            }
            Err(_) => {
                warn!("Navigation to {} timed out after {:?}", url, deadline);
                return Err(ScrapeError::NavigationTimeout(deadline));
            }
        }

        let snapshot = match self.policy.extraction_timeout {
            Some(limit) => tokio::time::timeout(limit, session.snapshot())
                .await
                .map_err(|_| {
                    ScrapeError::internal(anyhow::anyhow!(
                        "Reading the rendered document timed out after {:?}",
                        limit
                    ))
                })?,
            None => session.snapshot().await,
        };
        snapshot.map_err(ScrapeError::internal)
    }

    /// Tear down a session, giving up after the close deadline.
    async fn close_session(&self, session: Box<dyn RenderSession>, url: &Url) {
        let limit = self.policy.close_timeout;
        match tokio::time::timeout(limit, session.close()).await {
            Ok(Ok(())) => debug!("Closed rendering session for {}", url),
            Ok(Err(e)) => warn!("Failed to close rendering session for {}: {:#}", url, e),
            Err(_) => warn!(
                "Rendering session for {} did not close within {:?}, abandoning it",
                url, limit
            ),
        }
    }

    /// Shape check and extraction, run on the blocking pool.
    async fn extract_document(
        &self,
        html: String,
        options: ScrapeOptions,
    ) -> Result<ScrapeResult, ScrapeError> {
        let rules = self.rules.clone();
        tokio::task::spawn_blocking(move || evaluate(&rules, &html, options))
            .await
            .map_err(|e| ScrapeError::internal(anyhow::anyhow!("Extraction task failed: {}", e)))?
    }
}

fn evaluate(rules: &ExtractionRules, html: &str, options: ScrapeOptions) -> Result<ScrapeResult, ScrapeError> {
    let document = Html::parse_document(html);

    if !rules.is_expected_shape(&document) {
        return Err(ScrapeError::InvalidDocumentShape);
    }

    Ok(rules.extract(&document, options))
}
