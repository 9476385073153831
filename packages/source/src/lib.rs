#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event search sources.
//!
//! A source answers one page of a [`SearchQuery`] with a
//! [`SearchResponse`]. The [`EventSource`] trait is the seam the aggregator
//! pages through; [`eventbrite::EventbriteClient`] is the HTTP
//! implementation, configured from the embedded [`service_registry`].

pub mod eventbrite;
pub mod service_registry;

use std::time::Duration;

use async_trait::async_trait;
use eventmap_events_models::{SearchQuery, SearchResponse};

/// Errors that can occur while fetching a page of events.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (connection, status or body).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request did not complete within the per-request ceiling.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with an application-level error.
    #[error("API error: {message}")]
    Api {
        /// Message reported by the API.
        message: String,
    },
}

/// A remote event-search API.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns a unique identifier for this source (e.g., `"eventbrite"`).
    fn id(&self) -> &str;

    /// Fetches one page of results for `query`.
    ///
    /// Application errors embedded in an otherwise successful response are
    /// returned inside the [`SearchResponse`], not as an `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the body cannot be
    /// parsed.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError>;
}
