//! wikiscrape - headless-browser scraping service for encyclopedia pages.
//!
//! Loads a page in a rendering session, checks that it looks like an
//! article, and extracts cleaned headings and paragraphs behind a small
//! JSON HTTP API.

pub mod cli;
pub mod config;
pub mod scrapers;
pub mod server;

pub use config::Settings;
pub use scrapers::{
    Heading, HeadingLevel, ScrapeError, ScrapeOptions, ScrapeRequest, ScrapeResult, ScrapeService,
};
