//! Eventbrite event-search client.
//!
//! Issues `GET <base_url>?app_key=..&keywords=..&within=..&within_unit=..
//! &latitude=..&longitude=..&page=..&max=..` and decodes the JSON body into a
//! [`SearchResponse`]. Requests carry a hard timeout and are never retried;
//! a failed page is reported to the caller as-is.
//!
//! See <https://www.eventbrite.com/developer/v3/> for the current API; this
//! client targets the legacy `json/event_search` response shape.

use std::time::Duration;

use async_trait::async_trait;
use eventmap_events_models::{SearchQuery, SearchResponse};

use crate::service_registry::SearchService;
use crate::{EventSource, SourceError};

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// HTTP client for the Eventbrite search endpoint.
#[derive(Debug, Clone)]
pub struct EventbriteClient {
    id: String,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl EventbriteClient {
    /// Creates a client for `base_url` whose requests time out after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            id: "eventbrite".to_owned(),
            client,
            base_url: base_url.to_owned(),
            timeout,
        })
    }

    /// Creates a client from a registry entry.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying HTTP client cannot be
    /// built.
    pub fn from_service(service: &SearchService) -> Result<Self, SourceError> {
        let mut client = Self::new(&service.base_url, service.timeout())?;
        client.id.clone_from(&service.id);
        Ok(client)
    }

    /// The endpoint this client queries.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, query: &SearchQuery) -> reqwest::RequestBuilder {
        self.client.get(&self.base_url).query(query)
    }

    fn map_http_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Http(e)
        }
    }
}

#[async_trait]
impl EventSource for EventbriteClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        log::debug!(
            "{}: page {} within {}{} of ({:.4}, {:.4})",
            self.id,
            query.page,
            query.within,
            query.within_unit,
            query.latitude,
            query.longitude,
        );

        let response = self
            .request(query)
            .send()
            .await
            .map_err(|e| self.map_http_error(e))?
            .error_for_status()?;

        let text = response.text().await.map_err(|e| self.map_http_error(e))?;
        parse_response(&text)
    }
}

/// Decodes a response body.
fn parse_response(body: &str) -> Result<SearchResponse, SourceError> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        log::warn!("Failed to decode event search response: {e}\n  body preview: {preview}");
        SourceError::Json(e)
    })
}
