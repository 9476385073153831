//! Compile-time registry of event-search service configurations.
//!
//! Each service is defined in a TOML file under `services/` and embedded
//! with [`include_str!`].

use std::time::Duration;

use serde::Deserialize;

/// An event-search service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchService {
    /// Unique identifier (e.g., `"eventbrite"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search endpoint URL.
    pub base_url: String,
    /// Results requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_page_size() -> u32 {
    100
}

const fn default_timeout_secs() -> u64 {
    10
}

impl SearchService {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[("eventbrite", include_str!("../services/eventbrite.toml"))];

/// Returns all configured search services.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<SearchService> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse search service '{name}': {e}"))
        })
        .collect()
}

/// Looks up a service by id.
fn service(id: &str) -> Option<SearchService> {
    all_services().into_iter().find(|s| s.id == id)
}

/// The Eventbrite service definition.
///
/// # Panics
///
/// Panics if the embedded `eventbrite.toml` is missing from the registry.
#[must_use]
pub fn eventbrite() -> SearchService {
    service("eventbrite").unwrap_or_else(|| panic!("eventbrite service is not registered"))
}
