//! Request and result types for a single scrape.

use serde::{Deserialize, Serialize};

/// Which node kinds to extract from the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOptions {
    pub headings: bool,
    pub paragraphs: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            headings: true,
            paragraphs: true,
        }
    }
}

impl ScrapeOptions {
    /// True when every extraction toggle is on.
    pub fn all_enabled(&self) -> bool {
        self.headings && self.paragraphs
    }
}

/// A validated-on-use scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub url: String,
    pub options: ScrapeOptions,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, options: ScrapeOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }
}

/// Heading rank, serialized as the upper-case tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
}

impl HeadingLevel {
    /// Map a lower-case element name (`h1`..`h4`) to a level.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "h1" => Some(Self::H1),
            "h2" => Some(Self::H2),
            "h3" => Some(Self::H3),
            "h4" => Some(Self::H4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    pub text: String,
}

/// Extracted content, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
}

impl ScrapeResult {
    pub fn is_empty(&self) -> bool {
        self.headings.is_empty() && self.paragraphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_serializes_as_tag_name() {
        let heading = Heading {
            level: HeadingLevel::H2,
            text: "History".to_string(),
        };
        let json = serde_json::to_value(&heading).unwrap();
        assert_eq!(json, serde_json::json!({"level": "H2", "text": "History"}));
    }

    #[test]
    fn test_heading_level_from_tag() {
        assert_eq!(HeadingLevel::from_tag("h1"), Some(HeadingLevel::H1));
        assert_eq!(HeadingLevel::from_tag("h4"), Some(HeadingLevel::H4));
        assert_eq!(HeadingLevel::from_tag("h5"), None);
        assert_eq!(HeadingLevel::from_tag("H1"), None);
    }

    #[test]
    fn test_default_options_enable_everything() {
        let options = ScrapeOptions::default();
        assert!(options.headings);
        assert!(options.paragraphs);
        assert!(options.all_enabled());
    }
}
