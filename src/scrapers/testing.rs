//! In-memory rendering engine for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::browser::{RenderEngine, RenderSession};

/// Serves one static document and counts session lifecycle events.
#[derive(Default)]
pub(crate) struct StaticEngine {
    html: String,
    navigation_delay: Option<Duration>,
    navigation_error: Option<String>,
    snapshot_delay: Option<Duration>,
    snapshot_error: Option<String>,
    open_error: Option<String>,
    close_hangs: bool,
    counters: Arc<Counters>,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigated: AtomicUsize,
    events: Mutex<Vec<&'static str>>,
}

impl StaticEngine {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Default::default()
        }
    }

    /// Wrap `body` in the containers a real article page carries.
    pub fn article(body: &str) -> Self {
        Self::new(format!(
            "<!DOCTYPE html><html><head><title>Test</title></head><body>\
             <div id=\"content\"><div class=\"mw-parser-output\">{}</div></div>\
             </body></html>",
            body
        ))
    }

    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = Some(delay);
        self
    }

    pub fn with_navigation_error(mut self, message: &str) -> Self {
        self.navigation_error = Some(message.to_string());
        self
    }

    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = Some(delay);
        self
    }

    pub fn with_snapshot_error(mut self, message: &str) -> Self {
        self.snapshot_error = Some(message.to_string());
        self
    }

    pub fn with_open_error(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    /// Sessions never finish closing.
    pub fn with_hanging_close(mut self) -> Self {
        self.close_hangs = true;
        self
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigated(&self) -> usize {
        self.navigated.load(Ordering::SeqCst)
    }

    /// Session calls in the order they happened.
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: &'static str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

struct StaticSession {
    html: String,
    navigation_delay: Option<Duration>,
    navigation_error: Option<String>,
    snapshot_delay: Option<Duration>,
    snapshot_error: Option<String>,
    close_hangs: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl RenderEngine for StaticEngine {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>> {
        if let Some(ref message) = self.open_error {
            anyhow::bail!("{}", message);
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            html: self.html.clone(),
            navigation_delay: self.navigation_delay,
            navigation_error: self.navigation_error.clone(),
            snapshot_delay: self.snapshot_delay,
            snapshot_error: self.snapshot_error.clone(),
            close_hangs: self.close_hangs,
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl RenderSession for StaticSession {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        self.counters.navigated.fetch_add(1, Ordering::SeqCst);
        self.counters.record("navigate");
        if let Some(delay) = self.navigation_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.navigation_error {
            anyhow::bail!("{}", message);
        }
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<String> {
        self.counters.record("snapshot");
        if let Some(delay) = self.snapshot_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.snapshot_error {
            anyhow::bail!("{}", message);
        }
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.record("close");
        if self.close_hangs {
            std::future::pending::<()>().await;
        }
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
