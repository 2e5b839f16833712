//! Article scraping: rendering engine, extraction rules and the scrape pipeline.

pub mod browser;
mod error;
mod extract;
mod service;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub use browser::{ChromiumEngine, RenderEngine, RenderSession};
pub use error::ScrapeError;
pub use extract::{clean_text, ExtractionRules};
pub use service::{ScrapePolicy, ScrapeService};
pub use types::{Heading, HeadingLevel, ScrapeOptions, ScrapeRequest, ScrapeResult};
