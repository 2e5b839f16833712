//! DOM extraction rules for rendered article pages.
//!
//! Extraction runs against the rendered DOM snapshot of the page. Headings
//! and paragraphs are selected in document order, filtered, and passed
//! through [`clean_text`].

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};

use super::types::{Heading, HeadingLevel, ScrapeOptions, ScrapeResult};
use crate::config::ExtractConfig;

const HEADING_SELECTOR: &str = "h1, h2, h3, h4";
const PARAGRAPH_SELECTOR: &str = "p";

fn citation_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[0-9]+\]").expect("citation pattern is valid"))
}

/// Normalize extracted text.
///
/// Removes `[<digits>]` citation markers, collapses whitespace runs to a
/// single space and trims both ends.
pub fn clean_text(text: &str) -> String {
    let re = citation_marker();
    let mut stripped = text.to_string();
    // "[1[2]]" becomes "[1]" after one pass
    while re.is_match(&stripped) {
        stripped = re.replace_all(&stripped, "").into_owned();
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(raw: &str, what: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| anyhow::anyhow!("Invalid {} selector '{}': {:?}", what, raw, e))
}

/// Compiled selectors and patterns used to validate and extract a page.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    content_markers: Vec<Selector>,
    headings: Selector,
    paragraphs: Selector,
    edit_control: Selector,
    infobox: Selector,
    toc_label: Regex,
}

impl ExtractionRules {
    /// Compile rules from configuration, failing on bad selectors or patterns.
    pub fn from_config(config: &ExtractConfig) -> Result<Self> {
        if config.content_markers.is_empty() {
            anyhow::bail!("At least one content marker selector is required");
        }

        let content_markers = config
            .content_markers
            .iter()
            .map(|raw| parse_selector(raw, "content marker"))
            .collect::<Result<Vec<_>>>()?;

        let toc_label = RegexBuilder::new(&config.toc_pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid table of contents pattern '{}'", config.toc_pattern))?;

        Ok(Self {
            content_markers,
            headings: parse_selector(HEADING_SELECTOR, "heading")?,
            paragraphs: parse_selector(PARAGRAPH_SELECTOR, "paragraph")?,
            edit_control: parse_selector(&config.edit_control, "edit control")?,
            infobox: parse_selector(&config.infobox, "infobox")?,
            toc_label,
        })
    }

    /// Whether the document carries one of the expected content containers.
    pub fn is_expected_shape(&self, document: &Html) -> bool {
        self.content_markers
            .iter()
            .any(|marker| document.select(marker).next().is_some())
    }

    /// Extract the requested node kinds. Disabled kinds are never queried.
    pub fn extract(&self, document: &Html, options: ScrapeOptions) -> ScrapeResult {
        let headings = if options.headings {
            self.extract_headings(document)
        } else {
            Vec::new()
        };

        let paragraphs = if options.paragraphs {
            self.extract_paragraphs(document)
        } else {
            Vec::new()
        };

        ScrapeResult {
            headings,
            paragraphs,
        }
    }

    fn extract_headings(&self, document: &Html) -> Vec<Heading> {
        document
            .select(&self.headings)
            .filter(|h| h.select(&self.edit_control).next().is_none())
            .filter_map(|h| {
                let level = HeadingLevel::from_tag(h.value().name())?;
                let text = clean_text(&text_content(h));
                if self.toc_label.is_match(&text) {
                    return None;
                }
                Some(Heading { level, text })
            })
            .collect()
    }

    fn extract_paragraphs(&self, document: &Html) -> Vec<String> {
        document
            .select(&self.paragraphs)
            .filter(|p| !self.within_infobox(*p))
            .map(text_content)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| clean_text(&raw))
            .collect()
    }

    /// True if the element or any ancestor matches the infobox selector.
    fn within_infobox(&self, element: ElementRef<'_>) -> bool {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|node| self.infobox.matches(&node))
    }
}

/// Concatenated descendant text, like the DOM `textContent` property.
fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}
