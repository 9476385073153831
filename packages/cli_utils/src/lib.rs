#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the event map toolchain.
//!
//! Provides an `indicatif`-backed [`PageProgress`] bar for paged searches,
//! plus [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Progress through the pages of one search.
///
/// Starts as a spinner while the first page is in flight and switches to a
/// bar bounded by the page cap once the first page lands.
pub struct PageProgress {
    bar: ProgressBar,
    /// Style to switch to once the first page arrives.
    bar_style: ProgressStyle,
    max_pages: u64,
}

impl PageProgress {
    /// Adds a page progress bar to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress, message: &str, max_pages: u32) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} page {pos}/{len} [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self {
            bar,
            bar_style,
            max_pages: u64::from(max_pages),
        }
    }

    /// Records that `page` has been processed.
    pub fn page_done(&self, page: u32, message: String) {
        if self.bar.length().is_none() {
            self.bar.set_length(self.max_pages);
            self.bar.set_style(self.bar_style.clone());
        }
        self.bar.set_position(u64::from(page).min(self.max_pages));
        self.bar.set_message(message);
    }

    /// Finishes the bar, leaving `message` on screen.
    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }

    /// Finishes the bar and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
