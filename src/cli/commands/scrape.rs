//! One-shot scrape command.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::scrapers::{ChromiumEngine, ScrapeOptions, ScrapeRequest, ScrapeService};

/// Scrape one article through the same pipeline the server uses.
pub async fn cmd_scrape(
    settings: &Settings,
    url: &str,
    options: ScrapeOptions,
    pretty: bool,
) -> anyhow::Result<()> {
    let engine = Arc::new(ChromiumEngine::new(settings.browser.clone()));
    let service = ScrapeService::from_settings(settings, engine)?;

    let outcome = service.scrape(&ScrapeRequest::new(url, options)).await;
    service.engine().shutdown().await;

    match outcome {
        Ok(result) => {
            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{}", json);
            eprintln!(
                "{} {} headings, {} paragraphs",
                style("✓").green(),
                result.headings.len(),
                result.paragraphs.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e);
            if let Some(details) = e.details() {
                tracing::info!("{}", details);
            }
            std::process::exit(1);
        }
    }
}
