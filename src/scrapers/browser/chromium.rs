//! Headless Chromium engine over the DevTools protocol (chromiumoxide).

#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
#[cfg(feature = "browser")]
use anyhow::Context;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::config::BrowserEngineConfig;
#[cfg(feature = "browser")]
use super::config::BrowserEngineMode;
use super::{RenderEngine, RenderSession};

/// Resolves once the document has been parsed (DOMContentLoaded).
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

/// How long a closed browser process may take to exit before it is killed.
#[cfg(feature = "browser")]
const PROCESS_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A launched or connected browser plus the task driving its CDP connection.
#[cfg(feature = "browser")]
struct RunningBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[cfg(feature = "browser")]
impl RunningBrowser {
    /// Launch a local Chrome process.
    async fn launch(config: &BrowserEngineConfig) -> Result<Self> {
        info!("Launching browser (headless={})", config.headless);

        let explicit = config
            .chrome_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());
        let chrome_path = super::find_chrome(explicit)?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--safebrowsing-disable-auto-update")
            .arg("--no-sandbox") // Often needed for headless in containers
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Connect to a remote Chrome instance.
    async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        debug!("Connecting to WebSocket: {}", ws_url);

        let (browser, handler) = Browser::connect(ws_url)
            .await
            .context("Failed to connect to remote browser")?;

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Close the browser and wait for a launched process to exit.
    ///
    /// Falls back to killing the process when the close command fails or
    /// the process outlives [`PROCESS_EXIT_TIMEOUT`].
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close command failed, killing process: {}", e);
            self.kill().await;
        }

        match tokio::time::timeout(PROCESS_EXIT_TIMEOUT, self.browser.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Failed waiting for browser process: {}", e),
            Err(_) => {
                warn!(
                    "Browser process still running after {:?}, killing it",
                    PROCESS_EXIT_TIMEOUT
                );
                self.kill().await;
            }
        }

        self.handler.abort();
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            warn!("Failed to kill browser process: {}", e);
        }
    }
}

#[cfg(feature = "browser")]
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        // A bad message is not fatal; the stream ends when the connection does
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("Browser handler error: {}", e);
            }
        }
    })
}

/// What a session must tear down when it closes.
#[cfg(feature = "browser")]
enum SessionOwner {
    /// The session owns a whole browser process.
    Process(RunningBrowser),
    /// The session owns a browser context inside the shared browser.
    Context {
        browser: Arc<RunningBrowser>,
        context_id: BrowserContextId,
    },
}

/// A single page inside an isolated browsing context.
#[cfg(feature = "browser")]
pub struct ChromiumSession {
    page: Page,
    owner: SessionOwner,
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;

        let response = self
            .page
            .execute(nav_params)
            .await
            .with_context(|| format!("Navigation failed for {}", url))?;

        if let Some(ref error_text) = response.result.error_text {
            anyhow::bail!("Navigation failed for {}: {}", url, error_text);
        }

        let state: String = self
            .page
            .evaluate(WAIT_FOR_READY_SCRIPT)
            .await
            .context("Failed to wait for document ready state")?
            .into_value()
            .unwrap_or_else(|_| "unknown".to_string());
        debug!("Page ready state: {}", state);

        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String> {
        self.page
            .content()
            .await
            .context("Failed to read rendered document")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession { page, owner } = *self;

        if let Err(e) = page.close().await {
            debug!("Page close failed: {}", e);
        }

        match owner {
            SessionOwner::Process(running) => {
                running.close().await;
                Ok(())
            }
            SessionOwner::Context {
                browser,
                context_id,
            } => {
                browser
                    .browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await
                    .context("Failed to dispose browser context")?;
                Ok(())
            }
        }
    }
}

/// Chromium-backed rendering engine.
///
/// In `per_request` mode every session launches its own browser process.
/// In `shared` mode one browser is launched (or connected) lazily and each
/// session gets a fresh browser context inside it.
#[cfg(feature = "browser")]
pub struct ChromiumEngine {
    config: BrowserEngineConfig,
    shared: Mutex<Option<Arc<RunningBrowser>>>,
}

#[cfg(feature = "browser")]
impl ChromiumEngine {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            shared: Mutex::new(None),
        }
    }

    /// Launch or connect the shared browser if not already running.
    async fn shared_browser(&self) -> Result<Arc<RunningBrowser>> {
        let mut guard = self.shared.lock().await;
        if let Some(ref running) = *guard {
            return Ok(running.clone());
        }

        let remote = self.config.remote_url.as_deref().filter(|u| !u.is_empty());
        let running = match remote {
            Some(url) => RunningBrowser::connect(url).await?,
            None => RunningBrowser::launch(&self.config).await?,
        };
        let running = Arc::new(running);
        *guard = Some(running.clone());
        Ok(running)
    }

    /// Forget the shared browser so the next session relaunches it.
    async fn reset_shared(&self) {
        if self.shared.lock().await.take().is_some() {
            warn!("Discarding shared browser after session failure");
        }
    }

    async fn open_process_session(&self) -> Result<ChromiumSession> {
        let running = RunningBrowser::launch(&self.config).await?;
        match running.browser.new_page("about:blank").await {
            Ok(page) => Ok(ChromiumSession {
                page,
                owner: SessionOwner::Process(running),
            }),
            Err(e) => {
                running.close().await;
                Err(e).context("Failed to open page")
            }
        }
    }

    async fn open_context_session(&self) -> Result<ChromiumSession> {
        let running = self.shared_browser().await?;

        let context_id = match running
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
        {
            Ok(resp) => resp.result.browser_context_id.clone(),
            Err(e) => {
                self.reset_shared().await;
                return Err(e).context("Failed to create browser context");
            }
        };

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build target params: {}", e))?;

        match running.browser.new_page(target).await {
            Ok(page) => Ok(ChromiumSession {
                page,
                owner: SessionOwner::Context {
                    browser: running,
                    context_id,
                },
            }),
            Err(e) => {
                let _ = running
                    .browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                self.reset_shared().await;
                Err(e).context("Failed to open page")
            }
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        let session = match self.config.mode {
            BrowserEngineMode::PerRequest => self.open_process_session().await?,
            BrowserEngineMode::Shared => self.open_context_session().await?,
        };

        let user_agent = SetUserAgentOverrideParams::new(self.config.user_agent.clone());
        if let Err(e) = session.page.execute(user_agent).await {
            // The caller never sees this session, so release it here
            let _ = Box::new(session).close().await;
            return Err(e).context("Failed to set user agent");
        }

        Ok(Box::new(session))
    }

    async fn shutdown(&self) {
        let Some(running) = self.shared.lock().await.take() else {
            return;
        };
        match Arc::try_unwrap(running) {
            Ok(running) => {
                info!("Closing shared browser");
                running.close().await;
            }
            Err(_) => warn!("Shared browser still in use at shutdown; leaving it to drop"),
        }
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct ChromiumEngine {
    #[allow(dead_code)]
    config: BrowserEngineConfig,
}

#[cfg(not(feature = "browser"))]
impl ChromiumEngine {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }
}
