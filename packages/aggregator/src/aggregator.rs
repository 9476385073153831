//! The [`EventAggregator`] facade.
//!
//! All mutable state lives in one [`Session`] behind a mutex. Every change
//! to results, every host edit and every notification happens while that
//! lock is held, so observers never see a page's `Update` after the `Clear`
//! that discarded it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eventmap_events_models::{SearchQuery, SearchResponse};
use eventmap_geography::viewport;
use eventmap_source::{EventSource, SourceError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::AggregatorError;
use crate::classify::{self, Classifier};
use crate::config::{AggregatorConfig, SearchOverrides, SearchSettings};
use crate::host::{LayerDefinition, LayerEdits, MapHost};
use crate::notify::{Notification, Notifier};
use crate::pager::{self, Sequence};
use crate::requests::{RequestHandle, RequestId, RequestRegistry, Removal};
use crate::store::{DataPoint, ResultsStore, Stats};

struct Session {
    /// Bumped by every clear. Searches started under an older epoch are
    /// orphaned.
    epoch: u64,
    settings: SearchSettings,
    /// Query of the most recent search; `None` after a clear.
    query: Option<SearchQuery>,
    classifier: Classifier,
    store: ResultsStore,
    requests: RequestRegistry,
}

pub(crate) struct Inner {
    pub(crate) config: AggregatorConfig,
    pub(crate) source: Arc<dyn EventSource>,
    host: Arc<dyn MapHost>,
    session: Mutex<Session>,
    notifier: Notifier,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_sequence(&self, overrides: Option<SearchOverrides>) -> Sequence {
        let extent = self.host.extent();
        let area = viewport::search_area(&extent, self.config.max_radius);

        let mut session = self.lock();
        if let Some(overrides) = overrides {
            session.settings.apply(overrides);
        }
        let settings = session.settings.clone();

        let query = SearchQuery {
            app_key: settings.app_key,
            keywords: settings.keywords,
            within: area.radius,
            within_unit: area.units,
            latitude: area.center.y(),
            longitude: area.center.x(),
            page: 1,
            max: self.config.page_size,
        };

        log::info!(
            "{}: searching within {}{} of ({:.4}, {:.4}){}",
            self.config.id,
            query.within,
            query.within_unit,
            query.latitude,
            query.longitude,
            if query.keywords.is_empty() {
                String::new()
            } else {
                format!(" for \"{}\"", query.keywords)
            },
        );

        session.query = Some(query.clone());

        Sequence {
            query,
            epoch: session.epoch,
            display: extent.spatial_reference(),
            autopage: settings.autopage,
            max_pages: settings.max_pages,
        }
    }

    /// Registers a request for a search that is still current.
    pub(crate) fn begin_request(&self, epoch: u64) -> Option<RequestHandle> {
        let mut session = self.lock();
        (session.epoch == epoch).then(|| session.requests.register())
    }

    pub(crate) fn finish_request(&self, id: RequestId) {
        if self.lock().requests.remove(id) == Removal::Drained {
            log::debug!("{}: no requests outstanding", self.config.id);
        }
    }

    /// Classifies a page and publishes it. Returns `false` if the search was
    /// cleared while the page was in flight.
    pub(crate) fn apply_page(&self, sequence: &Sequence, response: &SearchResponse) -> bool {
        let mut guard = self.lock();
        let session = &mut *guard;
        if session.epoch != sequence.epoch {
            return false;
        }

        let batch = classify::process_page(
            &mut session.classifier,
            &mut session.store,
            &response.events,
            sequence.display,
        );
        session.store.publish();

        let stats = session.store.stats();
        log::debug!(
            "{}: page {}: {} placed, {} without location, {} duplicates ({} total)",
            self.config.id,
            sequence.query.page,
            batch.added.len(),
            batch.no_geo,
            batch.duplicates,
            stats.processed(),
        );

        if batch.rejected > 0 {
            log::warn!(
                "{}: page {}: skipped {} undecodable event(s)",
                self.config.id,
                sequence.query.page,
                batch.rejected
            );
        }

        let edits = LayerEdits::additions(batch.added);
        if !edits.is_empty() {
            self.host.apply_edits(&self.config.id, edits);
        }
        self.notifier.emit(Notification::Update {
            page: sequence.query.page,
        });
        true
    }

    /// Reports a failed search unless it was cleared meanwhile.
    pub(crate) fn fail(&self, epoch: u64, error: &SourceError) {
        let session = self.lock();
        if session.epoch == epoch {
            self.notifier.error(error.to_string());
        }
    }

    /// Reports a finished search unless it was cleared meanwhile.
    pub(crate) fn finish(&self, epoch: u64) {
        let session = self.lock();
        if session.epoch == epoch {
            self.notifier.emit(Notification::UpdateEnd);
        }
    }
}

/// A map overlay that searches for events around the current viewport.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EventAggregator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAggregator")
            .field("id", &self.inner.config.id)
            .field("source", &self.inner.source.id())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EventAggregator`].
pub struct EventAggregatorBuilder {
    source: Arc<dyn EventSource>,
    host: Option<Arc<dyn MapHost>>,
    config: AggregatorConfig,
}

impl EventAggregatorBuilder {
    /// Sets the map the aggregator draws onto. Required.
    #[must_use]
    pub fn with_map(mut self, host: Arc<dyn MapHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Replaces the default configuration.
    #[must_use]
    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration, registers the event layer with the map
    /// and marks the aggregator loaded.
    ///
    /// # Errors
    ///
    /// * [`AggregatorError::MissingMap`] if no map was set
    /// * [`AggregatorError::InvalidConfig`] if the configuration is out of range
    pub fn build(self) -> Result<EventAggregator, AggregatorError> {
        let host = self.host.ok_or(AggregatorError::MissingMap)?;
        self.config.validate()?;

        let config = self.config;
        let session = Session {
            epoch: 0,
            settings: config.settings(),
            query: None,
            classifier: Classifier::new(config.id.clone(), config.symbol.clone()),
            store: ResultsStore::new(),
            requests: RequestRegistry::new(),
        };

        host.add_layer(&LayerDefinition {
            id: config.id.clone(),
            visible: true,
            symbol: config.symbol.clone(),
        });
        session.store.set_loaded(true);

        log::info!(
            "{}: layer registered (source {})",
            config.id,
            self.source.id()
        );

        Ok(EventAggregator {
            inner: Arc::new(Inner {
                config,
                source: self.source,
                host,
                session: Mutex::new(session),
                notifier: Notifier::new(),
            }),
        })
    }
}

impl EventAggregator {
    /// Starts building an aggregator that searches `source`.
    #[must_use]
    pub fn builder(source: Arc<dyn EventSource>) -> EventAggregatorBuilder {
        EventAggregatorBuilder {
            source,
            host: None,
            config: AggregatorConfig::default(),
        }
    }

    /// The configuration the aggregator was built with.
    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    /// Starts a search around the map's current viewport.
    ///
    /// `overrides` are merged into the stored settings first and persist for
    /// later updates. Earlier searches keep running; results from all of
    /// them are deduplicated into the same store. The returned handle
    /// resolves when this search has finished, failed or been cancelled.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn update(&self, overrides: Option<SearchOverrides>) -> JoinHandle<()> {
        let sequence = self.inner.start_sequence(overrides);
        tokio::spawn(pager::run(Arc::clone(&self.inner), sequence))
    }

    /// Cancels outstanding requests and discards every result.
    ///
    /// Markers are removed from the map, counters reset, the seen-id set is
    /// emptied and a [`Notification::Clear`] is emitted. Searches that were
    /// running stop without further notifications.
    pub fn clear(&self) {
        let inner = &self.inner;
        let mut guard = inner.lock();
        let session = &mut *guard;

        session.epoch += 1;
        session.query = None;

        let cancelled = session.requests.cancel_all();
        if cancelled > 0 {
            log::info!(
                "{}: cancelled {cancelled} outstanding request(s)",
                inner.config.id
            );
        }

        inner.host.hide_info_window();

        let removed = session.store.reset();
        session.classifier.clear();
        if !removed.is_empty() {
            inner.host.apply_edits(
                &inner.config.id,
                LayerEdits::removals(removed.iter().map(|point| point.id().clone()).collect()),
            );
        }

        log::debug!("{}: cleared {} marker(s)", inner.config.id, removed.len());
        inner.notifier.emit(Notification::Clear);
    }

    /// Makes the event layer visible.
    pub fn show(&self) {
        self.set_visibility(true);
    }

    /// Hides the event layer.
    pub fn hide(&self) {
        self.set_visibility(false);
    }

    /// Shows or hides the event layer.
    pub fn set_visibility(&self, visible: bool) {
        self.inner
            .host
            .set_layer_visibility(&self.inner.config.id, visible);
    }

    /// Subscribes to lifecycle notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    /// Subscribes to counter updates.
    #[must_use]
    pub fn subscribe_stats(&self) -> watch::Receiver<Stats> {
        self.inner.lock().store.subscribe_stats()
    }

    /// Subscribes to data-point snapshots.
    #[must_use]
    pub fn subscribe_data_points(&self) -> watch::Receiver<Arc<[DataPoint]>> {
        self.inner.lock().store.subscribe_data_points()
    }

    /// Subscribes to the loaded flag.
    #[must_use]
    pub fn subscribe_loaded(&self) -> watch::Receiver<bool> {
        self.inner.lock().store.subscribe_loaded()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.inner.lock().store.stats()
    }

    /// Placed data points in arrival order.
    #[must_use]
    pub fn data_points(&self) -> Vec<DataPoint> {
        self.inner.lock().store.data_points().to_vec()
    }

    /// Number of requests currently outstanding.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Query of the most recent search, if any since the last clear.
    #[must_use]
    pub fn current_query(&self) -> Option<SearchQuery> {
        self.inner.lock().query.clone()
    }

    /// Re-runs the search every time the map's viewport changes.
    ///
    /// The returned task ends when the host stops publishing extents.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn watch_viewport(&self) -> JoinHandle<()> {
        let aggregator = self.clone();
        let mut extent_rx = self.inner.host.subscribe_extent();
        tokio::spawn(async move {
            while extent_rx.changed().await.is_ok() {
                log::debug!("{}: viewport changed", aggregator.inner.config.id);
                drop(aggregator.update(None));
            }
            log::debug!("{}: viewport watch ended", aggregator.inner.config.id);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use eventmap_events_models::{EventId, RadiusUnit};
    use eventmap_geography::{Extent, SpatialReference};
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::test_support::{
        RecordingHost, Reply, ScriptedSource, drain, located, page, unlocated,
    };

    fn build(source: &Arc<ScriptedSource>, host: &Arc<RecordingHost>) -> EventAggregator {
        build_with(source, host, AggregatorConfig::default())
    }

    fn build_with(
        source: &Arc<ScriptedSource>,
        host: &Arc<RecordingHost>,
        config: AggregatorConfig,
    ) -> EventAggregator {
        EventAggregator::builder(source.clone())
            .with_map(host.clone())
            .with_config(config)
            .build()
            .unwrap()
    }

    /// Yields until `condition` holds, failing after many rounds.
    async fn settle(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never held");
    }

    fn full_page(page_number: u64) -> Reply {
        let ids: Vec<_> = (0..3).map(|i| located(page_number * 100 + i)).collect();
        Reply::Page(page(1000, page_number * 100, &ids))
    }

    #[test]
    fn build_requires_map() {
        let source = ScriptedSource::new(vec![]);
        let result = EventAggregator::builder(source).build();
        assert!(matches!(result, Err(AggregatorError::MissingMap)));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let source = ScriptedSource::new(vec![]);
        let result = EventAggregator::builder(source)
            .with_map(RecordingHost::new())
            .with_config(AggregatorConfig {
                page_size: 0,
                ..AggregatorConfig::default()
            })
            .build();
        assert!(matches!(result, Err(AggregatorError::InvalidConfig { .. })));
    }

    #[test]
    fn build_registers_layer_and_loads() {
        let source = ScriptedSource::new(vec![]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        let layers = host.layers.lock().unwrap().clone();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].id, "eventbrite");
        assert!(layers[0].visible);
        assert!(*aggregator.subscribe_loaded().borrow());
        assert_eq!(aggregator.stats(), Stats::default());
        assert!(aggregator.current_query().is_none());
    }

    #[tokio::test]
    async fn single_page_search() {
        let source = ScriptedSource::new(vec![Reply::Page(page(
            2,
            2,
            &[located(1), unlocated(2)],
        ))]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();
        let stats_rx = aggregator.subscribe_stats();

        aggregator.update(None).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![Notification::Update { page: 1 }, Notification::UpdateEnd]
        );
        assert_eq!(source.queries().len(), 1);
        assert_eq!(
            *stats_rx.borrow(),
            Stats {
                geo_points: 1,
                geo_names: 0,
                no_geo: 1
            }
        );

        let edits = host.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].adds.len(), 1);
        assert!(edits[0].deletes.is_empty());
        assert_eq!(edits[0].adds[0].attributes.source_tag, "eventbrite");
        assert_eq!(aggregator.in_flight(), 0);
    }

    #[tokio::test]
    async fn query_reflects_viewport_and_settings() {
        let source = ScriptedSource::new(vec![]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        aggregator
            .update(Some(
                SearchOverrides::default()
                    .with_keywords("jazz")
                    .with_app_key("KEY"),
            ))
            .await
            .unwrap();

        let query = &source.queries()[0];
        assert_eq!(query.keywords, "jazz");
        assert_eq!(query.app_key, "KEY");
        assert_eq!(query.page, 1);
        assert_eq!(query.max, 100);
        assert_eq!(query.within_unit, RadiusUnit::Miles);
        assert!((1..=10).contains(&query.within));
        assert!((query.latitude - 40.725).abs() < 0.01);
        assert!((query.longitude - -74.0).abs() < 0.01);
        assert_eq!(aggregator.current_query().as_ref(), Some(query));

        // Overrides persist for later updates.
        aggregator.update(None).await.unwrap();
        assert_eq!(source.queries()[1].keywords, "jazz");
    }

    #[tokio::test]
    async fn pages_stop_at_max_pages() {
        let source = ScriptedSource::new((1..=6).map(full_page).collect());
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        let pages: Vec<_> = source.queries().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 2, 3, 4, 5]);

        let notifications = drain(&mut rx);
        assert_eq!(notifications.len(), 6);
        assert_eq!(notifications.last(), Some(&Notification::UpdateEnd));
        assert_eq!(notifications[4], Notification::Update { page: 5 });
        assert_eq!(aggregator.stats().geo_points, 15);
    }

    #[tokio::test]
    async fn autopage_disabled_fetches_one_page() {
        let source = ScriptedSource::new((1..=3).map(full_page).collect());
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        aggregator
            .update(Some(SearchOverrides::default().with_autopage(false)))
            .await
            .unwrap();

        assert_eq!(source.queries().len(), 1);
    }

    #[tokio::test]
    async fn stops_when_all_results_shown() {
        let source = ScriptedSource::new(vec![
            Reply::Page(page(4, 2, &[located(1), located(2)])),
            Reply::Page(page(4, 4, &[located(3), located(4)])),
            full_page(3),
        ]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        aggregator.update(None).await.unwrap();

        assert_eq!(source.queries().len(), 2);
        assert_eq!(aggregator.stats().geo_points, 4);
    }

    #[tokio::test]
    async fn empty_result_ends_without_update() {
        let source = ScriptedSource::new(vec![Reply::Page(SearchResponse::default())]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        assert_eq!(drain(&mut rx), vec![Notification::UpdateEnd]);
        assert_eq!(aggregator.stats(), Stats::default());
        assert!(host.edits().is_empty());
    }

    #[tokio::test]
    async fn duplicates_across_pages_are_counted_once() {
        let source = ScriptedSource::new(vec![
            Reply::Page(page(4, 2, &[located(1), located(2)])),
            Reply::Page(page(4, 4, &[located(2), unlocated(3)])),
        ]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        aggregator.update(None).await.unwrap();

        let stats = aggregator.stats();
        assert_eq!(stats.geo_points, 2);
        assert_eq!(stats.no_geo, 1);
        let ids: Vec<_> = aggregator
            .data_points()
            .iter()
            .map(|point| point.id().as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn repeated_updates_do_not_duplicate_markers() {
        let source = ScriptedSource::new(vec![
            Reply::Page(page(1, 1, &[located(1)])),
            Reply::Page(page(1, 1, &[located(1)])),
        ]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();
        aggregator.update(None).await.unwrap();

        assert_eq!(aggregator.stats().processed(), 1);
        assert_eq!(host.edits().len(), 1);
        // The second page still reports progress even though nothing new
        // was placed.
        assert_eq!(
            drain(&mut rx),
            vec![
                Notification::Update { page: 1 },
                Notification::UpdateEnd,
                Notification::Update { page: 1 },
                Notification::UpdateEnd,
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_keeps_earlier_pages() {
        let source = ScriptedSource::new(vec![full_page(1), Reply::Fail]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        let notifications = drain(&mut rx);
        assert_eq!(notifications.len(), 3);
        assert_eq!(notifications[0], Notification::Update { page: 1 });
        assert!(matches!(
            &notifications[1],
            Notification::Error { message } if message.contains("JSON parse error")
        ));
        assert_eq!(notifications[2], Notification::UpdateEnd);
        assert_eq!(source.queries().len(), 2);
        assert_eq!(aggregator.stats().geo_points, 3);
    }

    #[tokio::test]
    async fn application_error_is_reported() {
        let response: SearchResponse = serde_json::from_value(json!({
            "error": {"error_type": "Authentication Error", "error_message": "invalid key"},
            "events": [{"event": {"id": 9, "venue": {"latitude": "1", "longitude": "1"}}}]
        }))
        .unwrap();
        let source = ScriptedSource::new(vec![Reply::Page(response)]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                Notification::Error {
                    message: "API error: Authentication Error: invalid key".to_owned()
                },
                Notification::UpdateEnd,
            ]
        );
        assert_eq!(aggregator.stats(), Stats::default());
        assert!(host.edits().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_request_times_out() {
        let source = ScriptedSource::new(vec![Reply::Hang]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        let notifications = drain(&mut rx);
        assert!(matches!(
            &notifications[0],
            Notification::Error { message } if message.contains("timed out")
        ));
        assert_eq!(notifications[1], Notification::UpdateEnd);
        assert_eq!(aggregator.in_flight(), 0);
    }

    #[tokio::test]
    async fn clear_cancels_outstanding_requests() {
        let source = ScriptedSource::new(vec![Reply::Hang, Reply::Hang, Reply::Hang]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        let handles: Vec<_> = (0..3).map(|_| aggregator.update(None)).collect();
        settle(|| aggregator.in_flight() == 3).await;

        aggregator.clear();
        assert_eq!(aggregator.in_flight(), 0);

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }

        assert_eq!(drain(&mut rx), vec![Notification::Clear]);
        assert_eq!(aggregator.stats(), Stats::default());
        assert!(aggregator.current_query().is_none());
        assert!(host.edits().is_empty());
        assert_eq!(host.info_window_hides(), 1);
    }

    #[tokio::test]
    async fn undecodable_event_does_not_drop_its_page() {
        let source = ScriptedSource::new(vec![Reply::Page(page(
            4,
            4,
            &[
                located(1),
                json!({"id": 2, "logo": false, "title": ["odd"], "venue": {"latitude": "40.7", "longitude": "-74.0"}}),
                json!({"title": "no id"}),
                unlocated(3),
            ],
        ))]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        aggregator.update(None).await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![Notification::Update { page: 1 }, Notification::UpdateEnd]
        );
        assert_eq!(
            aggregator.stats(),
            Stats {
                geo_points: 2,
                geo_names: 0,
                no_geo: 1
            }
        );
        assert_eq!(host.edits()[0].adds.len(), 2);
    }

    #[tokio::test]
    async fn clear_after_response_discards_page() {
        let gate = Arc::new(Notify::new());
        let source = ScriptedSource::new(vec![Reply::Gated(
            gate.clone(),
            page(1, 1, &[located(1)]),
        )]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        let search = aggregator.update(None);
        settle(|| aggregator.in_flight() == 1).await;

        // The response is ready but not yet processed when the clear lands.
        gate.notify_one();
        aggregator.clear();
        search.await.unwrap();

        assert_eq!(drain(&mut rx), vec![Notification::Clear]);
        assert!(host.edits().is_empty());
        assert_eq!(aggregator.stats(), Stats::default());
    }

    #[test]
    fn page_from_cleared_search_is_not_applied() {
        let source = ScriptedSource::new(vec![]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let mut rx = aggregator.subscribe();

        let sequence = aggregator.inner.start_sequence(None);
        aggregator.clear();
        drain(&mut rx);

        let applied = aggregator
            .inner
            .apply_page(&sequence, &page(1, 1, &[located(1)]));

        assert!(!applied);
        assert!(drain(&mut rx).is_empty());
        assert!(host.edits().is_empty());
        assert_eq!(aggregator.stats(), Stats::default());

        // A search started after the clear is applied normally.
        let current = aggregator.inner.start_sequence(None);
        assert!(
            aggregator
                .inner
                .apply_page(&current, &page(1, 1, &[located(1)]))
        );
        assert_eq!(drain(&mut rx), vec![Notification::Update { page: 1 }]);
        assert_eq!(host.edits().len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_markers_and_forgets_ids() {
        let source = ScriptedSource::new(vec![
            Reply::Page(page(2, 2, &[located(1), located(2)])),
            Reply::Page(page(1, 1, &[located(1)])),
        ]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let points_rx = aggregator.subscribe_data_points();

        aggregator.update(None).await.unwrap();
        assert_eq!(points_rx.borrow().len(), 2);

        aggregator.clear();

        let edits = host.edits();
        assert_eq!(edits.len(), 2);
        assert_eq!(
            edits[1].deletes,
            vec![EventId::new("1"), EventId::new("2")]
        );
        assert!(points_rx.borrow().is_empty());
        assert_eq!(aggregator.stats(), Stats::default());

        // The same id is placed again after a clear.
        aggregator.update(None).await.unwrap();
        assert_eq!(aggregator.stats().geo_points, 1);
        assert_eq!(host.edits().len(), 3);
    }

    #[tokio::test]
    async fn markers_use_display_spatial_reference() {
        let source = ScriptedSource::new(vec![Reply::Page(page(1, 1, &[located(1)]))]);
        let host = RecordingHost::with_extent(Extent::new(
            -74.06,
            40.68,
            -73.94,
            40.77,
            SpatialReference::Wgs84,
        ));
        let aggregator = build(&source, &host);

        aggregator.update(None).await.unwrap();

        let point = aggregator.data_points()[0].geometry;
        assert!((point.x() - -74.006).abs() < 1e-9);
        assert!((point.y() - 40.7128).abs() < 1e-9);
    }

    #[test]
    fn visibility_is_forwarded_to_host() {
        let source = ScriptedSource::new(vec![]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);

        aggregator.hide();
        aggregator.show();
        aggregator.set_visibility(false);

        assert_eq!(*host.visibility.lock().unwrap(), vec![false, true, false]);
    }

    #[tokio::test]
    async fn viewport_change_triggers_search() {
        let source = ScriptedSource::new(vec![]);
        let host = RecordingHost::new();
        let aggregator = build(&source, &host);
        let watcher = aggregator.watch_viewport();

        host.set_extent(Extent::from_geographic_bounds(-0.2, 51.4, 0.0, 51.6));
        settle(|| !source.queries().is_empty()).await;

        assert!((source.queries()[0].latitude - 51.5).abs() < 0.05);
        watcher.abort();
    }

    #[tokio::test]
    async fn custom_layer_id_tags_events() {
        let source = ScriptedSource::new(vec![Reply::Page(page(1, 1, &[located(1)]))]);
        let host = RecordingHost::new();
        let aggregator = build_with(
            &source,
            &host,
            AggregatorConfig {
                id: "concerts".to_owned(),
                ..AggregatorConfig::default()
            },
        );

        aggregator.update(None).await.unwrap();

        assert_eq!(host.edits.lock().unwrap()[0].0, "concerts");
        assert_eq!(
            aggregator.data_points()[0].attributes.source_tag,
            "concerts"
        );
    }
}
