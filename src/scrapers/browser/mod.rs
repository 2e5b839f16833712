//! Rendering engine abstraction and its headless Chromium implementation.
//!
//! A [`RenderEngine`] hands out one [`RenderSession`] per scrape. Sessions
//! load a single document and must be closed on every exit path; `close`
//! consumes the session so it cannot be used afterwards.

mod binary;
mod chromium;
mod config;

pub use binary::find_chrome;
pub use chromium::ChromiumEngine;
pub use config::{BrowserEngineConfig, BrowserEngineMode, DEFAULT_USER_AGENT};

use anyhow::Result;
use async_trait::async_trait;

/// Source of isolated rendering sessions.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Create a fresh, isolated browsing context.
    async fn open_session(&self) -> Result<Box<dyn RenderSession>>;

    /// Release process-wide resources. Called once at shutdown.
    async fn shutdown(&self) {}
}

/// One isolated browsing context holding a single page.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate and wait until the initial document structure is loaded
    /// (DOMContentLoaded), not until the network is idle.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Serialized HTML of the rendered document.
    async fn snapshot(&mut self) -> Result<String>;

    /// Tear down the session and everything it owns.
    async fn close(self: Box<Self>) -> Result<()>;
}
