//! The `/scrap` endpoint.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::super::AppState;
use crate::scrapers::{ScrapeError, ScrapeOptions, ScrapeRequest};

/// Raw query parameters. Flags stay strings so bad values become typed errors.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapQuery {
    pub url: Option<String>,
    pub headings: Option<String>,
    pub paragraphs: Option<String>,
}

impl ScrapQuery {
    fn into_request(self) -> Result<ScrapeRequest, ScrapeError> {
        let url = self.url.ok_or(ScrapeError::InvalidUrl)?;
        let options = ScrapeOptions {
            headings: parse_flag("headings", self.headings.as_deref())?,
            paragraphs: parse_flag("paragraphs", self.paragraphs.as_deref())?,
        };
        Ok(ScrapeRequest::new(url, options))
    }
}

/// Parse a boolean query flag. Absent means `true`.
fn parse_flag(name: &str, value: Option<&str>) -> Result<bool, ScrapeError> {
    let Some(raw) = value else {
        return Ok(true);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ScrapeError::InvalidOption {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::warn!("Scrape failed ({}): {}", self.kind(), self);
        } else {
            tracing::debug!("Scrape rejected ({}): {}", self.kind(), self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

/// Scrape one article and return its headings and paragraphs.
pub async fn scrap(
    State(state): State<AppState>,
    query: Result<Query<ScrapQuery>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => return ScrapeError::InvalidQuery(rejection.body_text()).into_response(),
    };

    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    // Run detached so a dropped connection cannot abandon an open session
    let service = state.service.clone();
    let task = tokio::spawn(async move { service.scrape(&request).await });

    match task.await {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => ScrapeError::internal(anyhow::anyhow!("Scrape task failed: {}", e)).into_response(),
    }
}
