#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Viewport-driven event search aggregation.
//!
//! An [`EventAggregator`] is attached to a host map ([`host::MapHost`]) and
//! an event source ([`eventmap_source::EventSource`]). On every update it
//! derives a search area from the map's viewport, pages through the search
//! results one request at a time, drops events it has already seen,
//! classifies the rest by whether their venue can be placed, and pushes the
//! placed ones to the host as markers.
//!
//! Progress is observable two ways:
//!
//! - per-field [`tokio::sync::watch`] channels for [`store::Stats`], the data
//!   points and the loaded flag;
//! - a broadcast stream of [`notify::Notification`]s (`Update`,
//!   `UpdateEnd`, `Error`, `Clear`).

pub mod aggregator;
pub mod classify;
pub mod config;
pub mod host;
pub mod notify;
pub mod pager;
pub mod requests;
pub mod store;

#[cfg(test)]
mod test_support;

pub use aggregator::{EventAggregator, EventAggregatorBuilder};

use eventmap_source::SourceError;

/// Errors that can occur while building or configuring an aggregator.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    /// No host map was supplied.
    #[error("A host map is required to build an event aggregator")]
    MissingMap,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Which value is wrong and why.
        message: String,
    },

    /// The event source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The configuration file is not valid TOML for [`config::AggregatorConfig`].
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error (config file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
