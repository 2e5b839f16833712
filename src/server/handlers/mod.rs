//! HTTP request handlers for the web server.

mod api;
mod scrape;

pub use api::{health, test};
pub use scrape::scrap;
