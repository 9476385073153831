//! Sequential, cancellable paging through one search.
//!
//! A search issues page 1, classifies the response, then decides with
//! [`next_step`] whether to request the following page. Page N+1 is never
//! requested before page N has been processed. Failures end the search;
//! nothing is retried.

use std::sync::Arc;

use eventmap_events_models::{SearchQuery, SearchResponse, Summary};
use eventmap_geography::SpatialReference;
use eventmap_source::SourceError;

use crate::aggregator::Inner;

/// Why a search stopped requesting pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The page carried no events.
    NoEvents,
    /// Auto-paging is switched off.
    AutopageDisabled,
    /// The page cap was reached.
    MaxPagesReached,
    /// The summary reports every result as shown.
    AllShown,
}

/// What to do after a page has been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// Request the next page.
    Continue,
    /// The search is complete.
    Done(DoneReason),
}

/// Decides whether to fetch another page after `page_count` pages.
#[must_use]
pub fn next_step(
    response: &SearchResponse,
    autopage: bool,
    max_pages: u32,
    page_count: u32,
) -> PageStep {
    if response.events.is_empty() {
        PageStep::Done(DoneReason::NoEvents)
    } else if !autopage {
        PageStep::Done(DoneReason::AutopageDisabled)
    } else if page_count >= max_pages {
        PageStep::Done(DoneReason::MaxPagesReached)
    } else if !response.summary().is_some_and(Summary::has_more) {
        PageStep::Done(DoneReason::AllShown)
    } else {
        PageStep::Continue
    }
}

/// One search in progress: its own query plus the settings it started with.
#[derive(Debug, Clone)]
pub(crate) struct Sequence {
    pub query: SearchQuery,
    /// Session epoch at start; a clear bumps the epoch and orphans the search.
    pub epoch: u64,
    /// Spatial reference markers are projected into.
    pub display: SpatialReference,
    pub autopage: bool,
    pub max_pages: u32,
}

/// Runs a search to completion, cancellation or failure.
pub(crate) async fn run(inner: Arc<Inner>, mut sequence: Sequence) {
    let label = inner.config.id.clone();
    let timeout = inner.config.request_timeout();
    let mut page_count: u32 = 1;

    loop {
        let page = sequence.query.page;
        let Some(handle) = inner.begin_request(sequence.epoch) else {
            log::debug!("{label}: search discarded before page {page}");
            return;
        };

        log::debug!("{label}: requesting page {page} ({})", handle.id());

        let outcome = tokio::select! {
            biased;
            () = handle.cancelled() => None,
            result = tokio::time::timeout(timeout, inner.source.search(&sequence.query)) => {
                Some(result.unwrap_or_else(|_| Err(SourceError::Timeout(timeout))))
            }
        };
        inner.finish_request(handle.id());

        let response = match outcome {
            None => {
                log::info!("{label}: search cancelled (page {page})");
                return;
            }
            Some(Err(e)) if handle.is_cancelled() => {
                log::info!("{label}: search cancelled (page {page}): {e}");
                return;
            }
            Some(Err(e)) => {
                log::warn!("{label}: search error on page {page}: {e}");
                inner.fail(sequence.epoch, &e);
                return;
            }
            Some(Ok(response)) => response,
        };

        if let Some(message) = response.error_message() {
            let error = SourceError::Api { message };
            log::error!("{label}: {error}");
            inner.fail(sequence.epoch, &error);
            return;
        }

        if response.events.is_empty() {
            log::debug!("{label}: no results on page {page}");
            inner.finish(sequence.epoch);
            return;
        }

        if !inner.apply_page(&sequence, &response) {
            log::info!("{label}: discarding page {page}, results were cleared");
            return;
        }

        match next_step(&response, sequence.autopage, sequence.max_pages, page_count) {
            PageStep::Continue => {
                sequence.query.page += 1;
                page_count += 1;
            }
            PageStep::Done(reason) => {
                log::debug!("{label}: search finished after page {page} ({reason:?})");
                inner.finish(sequence.epoch);
                return;
            }
        }
    }
}
