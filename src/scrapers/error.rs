//! Scrape error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Why a scrape failed. Exactly one variant is produced per failed request.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: it must start with http:// or https://")]
    InvalidUrl,

    #[error("Unsupported domain '{host}': this service only scrapes {allowed}")]
    UnsupportedDomain { host: String, allowed: String },

    #[error("Invalid value '{value}' for '{name}': expected true or false")]
    InvalidOption { name: String, value: String },

    #[error("Malformed query string: {0}")]
    InvalidQuery(String),

    #[error("Could not load the page within {0:?}. Check the URL or try again later.")]
    NavigationTimeout(Duration),

    #[error("The page does not look like a valid article or is empty")]
    InvalidDocumentShape,

    #[error("No data could be extracted from this page. Check that the URL is correct.")]
    NoDataExtracted,

    #[error("Scraping failed: {message}")]
    Internal { message: String, trace: String },
}

impl ScrapeError {
    /// Wrap an unexpected failure, keeping the full cause chain as the trace.
    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            trace: format!("{:?}", err),
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidUrl
            | Self::UnsupportedDomain { .. }
            | Self::InvalidOption { .. }
            | Self::InvalidQuery(_)
            | Self::InvalidDocumentShape => 400,
            Self::NoDataExtracted => 404,
            Self::Internal { .. } => 500,
            Self::NavigationTimeout(_) => 504,
        }
    }

    /// Diagnostic trace, only present for internal failures.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Internal { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::UnsupportedDomain { .. } => "unsupported_domain",
            Self::InvalidOption { .. } => "invalid_option",
            Self::InvalidQuery(_) => "invalid_query",
            Self::NavigationTimeout(_) => "navigation_timeout",
            Self::InvalidDocumentShape => "invalid_document_shape",
            Self::NoDataExtracted => "no_data_extracted",
            Self::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_status_codes() {
        assert_eq!(ScrapeError::InvalidUrl.status_code(), 400);
        assert_eq!(
            ScrapeError::UnsupportedDomain {
                host: "example.com".into(),
                allowed: "wikipedia.org".into()
            }
            .status_code(),
            400
        );
        assert_eq!(ScrapeError::InvalidDocumentShape.status_code(), 400);
        assert_eq!(
            ScrapeError::InvalidQuery("duplicate field `url`".into()).status_code(),
            400
        );
        assert_eq!(ScrapeError::NoDataExtracted.status_code(), 404);
        assert_eq!(ScrapeError::NavigationTimeout(Duration::from_secs(30)).status_code(), 504);
        assert_eq!(
            ScrapeError::internal(anyhow::anyhow!("boom")).status_code(),
            500
        );
    }

    #[test]
    fn test_internal_keeps_cause_chain() {
        let err: anyhow::Result<()> = Err(std::io::Error::other("socket closed"))
            .context("Failed to evaluate page");
        let err = ScrapeError::internal(err.unwrap_err());

        assert_eq!(err.to_string(), "Scraping failed: Failed to evaluate page");
        let details = err.details().unwrap();
        assert!(details.contains("Failed to evaluate page"));
        assert!(details.contains("socket closed"));
    }

    #[test]
    fn test_details_only_for_internal() {
        assert!(ScrapeError::InvalidUrl.details().is_none());
        assert!(ScrapeError::NavigationTimeout(Duration::from_secs(30)).details().is_none());
    }
}
