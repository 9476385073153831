//! Aggregator configuration.
//!
//! [`AggregatorConfig`] is fixed at construction. The subset that may change
//! between searches (keywords, credential, paging limits) lives in
//! [`SearchSettings`] and is adjusted through [`SearchOverrides`] passed to
//! `EventAggregator::update`.

use std::path::Path;
use std::time::Duration;

use eventmap_geography::viewport::DEFAULT_MAX_RADIUS;
use eventmap_source::eventbrite::EventbriteClient;
use eventmap_source::service_registry;
use serde::{Deserialize, Serialize};

use crate::AggregatorError;

/// Visual used for every marker on the event layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSymbol {
    /// Image URL or path.
    pub url: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for MarkerSymbol {
    fn default() -> Self {
        Self {
            url: "images/eb_icon.png".to_owned(),
            width: 24,
            height: 24,
        }
    }
}

/// Configuration for an event aggregator, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// API credential.
    pub app_key: String,
    /// Layer identifier; also tags every event the layer produces.
    pub id: String,
    /// Search filter.
    pub keywords: String,
    /// Whether to keep fetching pages while more results exist.
    pub autopage: bool,
    /// Upper bound on pages fetched per search.
    pub max_pages: u32,
    /// Results requested per page.
    pub page_size: u32,
    /// Largest search radius in miles.
    pub max_radius: f64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Search endpoint URL.
    pub endpoint: String,
    /// Marker visual.
    pub symbol: MarkerSymbol,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let service = service_registry::eventbrite();
        Self {
            app_key: String::new(),
            id: service.id,
            keywords: String::new(),
            autopage: true,
            max_pages: 5,
            page_size: service.page_size,
            max_radius: DEFAULT_MAX_RADIUS,
            request_timeout_secs: service.timeout_secs,
            endpoint: service.base_url,
            symbol: MarkerSymbol::default(),
        }
    }
}

impl AggregatorConfig {
    /// Parses a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::ConfigParse`] if the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self, AggregatorError> {
        Ok(toml::de::from_str(s)?)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AggregatorError> {
        let contents = std::fs::read_to_string(path)?;
        log::debug!("Loaded aggregator config from {}", path.display());
        Self::from_toml_str(&contents)
    }

    /// Checks that the configuration can drive a search.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), AggregatorError> {
        let invalid = |message: &str| {
            Err(AggregatorError::InvalidConfig {
                message: message.to_owned(),
            })
        };

        if self.id.is_empty() {
            return invalid("layer id must not be empty");
        }
        if self.max_pages == 0 {
            return invalid("max_pages must be at least 1");
        }
        if self.page_size == 0 {
            return invalid("page_size must be at least 1");
        }
        if !self.max_radius.is_finite() || self.max_radius < 0.0 {
            return invalid("max_radius must be a non-negative number");
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Builds an HTTP client for the configured endpoint and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AggregatorError::Source`] if the client cannot be built.
    pub fn client(&self) -> Result<EventbriteClient, AggregatorError> {
        Ok(EventbriteClient::new(&self.endpoint, self.request_timeout())?)
    }

    /// The initial search settings.
    #[must_use]
    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            app_key: self.app_key.clone(),
            keywords: self.keywords.clone(),
            autopage: self.autopage,
            max_pages: self.max_pages,
        }
    }
}

/// Search parameters that may change between updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    /// API credential.
    pub app_key: String,
    /// Search filter.
    pub keywords: String,
    /// Whether to keep fetching pages while more results exist.
    pub autopage: bool,
    /// Upper bound on pages fetched per search.
    pub max_pages: u32,
}

impl SearchSettings {
    /// Merges `overrides` into these settings. A `max_pages` override of 0
    /// is raised to 1.
    pub fn apply(&mut self, overrides: SearchOverrides) {
        if let Some(app_key) = overrides.app_key {
            self.app_key = app_key;
        }
        if let Some(keywords) = overrides.keywords {
            self.keywords = keywords;
        }
        if let Some(autopage) = overrides.autopage {
            self.autopage = autopage;
        }
        if let Some(max_pages) = overrides.max_pages {
            self.max_pages = max_pages.max(1);
        }
    }
}

/// Partial settings supplied with an explicit update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOverrides {
    /// Replacement credential.
    pub app_key: Option<String>,
    /// Replacement search filter.
    pub keywords: Option<String>,
    /// Replacement auto-paging flag.
    pub autopage: Option<bool>,
    /// Replacement page cap.
    pub max_pages: Option<u32>,
}

impl SearchOverrides {
    /// Sets the keywords override.
    #[must_use]
    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = Some(keywords.to_owned());
        self
    }

    /// Sets the credential override.
    #[must_use]
    pub fn with_app_key(mut self, app_key: &str) -> Self {
        self.app_key = Some(app_key.to_owned());
        self
    }

    /// Sets the auto-paging override.
    #[must_use]
    pub const fn with_autopage(mut self, autopage: bool) -> Self {
        self.autopage = Some(autopage);
        self
    }

    /// Sets the page cap override.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}
