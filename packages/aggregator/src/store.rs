//! Observable stats and results.
//!
//! The store owns the running counters and the ordered list of placed data
//! points. Each field is published on its own [`watch`] channel so observers
//! (a status panel, a list view) can subscribe to just the field they show.
//! Values only grow between resets.

use std::sync::Arc;

use eventmap_events_models::{EventId, TaggedEvent};
use geo::Point;
use serde::Serialize;
use tokio::sync::watch;

use crate::config::MarkerSymbol;

/// Running classification counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Events placed on the map.
    pub geo_points: u64,
    /// Events located by place name only. Reserved; nothing increments it.
    pub geo_names: u64,
    /// Events with missing or unparseable coordinates.
    pub no_geo: u64,
}

impl Stats {
    /// Number of distinct events classified.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.geo_points + self.geo_names + self.no_geo
    }
}

/// A placed event: its display geometry, marker symbol and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Location in the map's display spatial reference.
    pub geometry: Point<f64>,
    /// Marker visual.
    pub symbol: MarkerSymbol,
    /// The tagged event record.
    pub attributes: TaggedEvent,
}

impl DataPoint {
    /// The identifier of the event this point represents.
    #[must_use]
    pub const fn id(&self) -> &EventId {
        &self.attributes.event.id
    }
}

/// Accumulated results plus the channels they are published on.
#[derive(Debug)]
pub struct ResultsStore {
    stats: Stats,
    data_points: Vec<DataPoint>,
    stats_tx: watch::Sender<Stats>,
    data_points_tx: watch::Sender<Arc<[DataPoint]>>,
    loaded_tx: watch::Sender<bool>,
}

impl Default for ResultsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsStore {
    /// Creates an empty, not-yet-loaded store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stats: Stats::default(),
            data_points: Vec::new(),
            stats_tx: watch::channel(Stats::default()).0,
            data_points_tx: watch::channel(Arc::from(Vec::new())).0,
            loaded_tx: watch::channel(false).0,
        }
    }

    /// Current counters.
    #[must_use]
    pub const fn stats(&self) -> Stats {
        self.stats
    }

    /// Placed data points in arrival order.
    #[must_use]
    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    /// Counts an event without usable coordinates.
    pub const fn record_no_geo(&mut self) {
        self.stats.no_geo += 1;
    }

    /// Appends a placed event.
    pub fn record_point(&mut self, point: DataPoint) {
        self.stats.geo_points += 1;
        self.data_points.push(point);
    }

    /// Pushes the current stats and data points to observers.
    pub fn publish(&self) {
        self.stats_tx.send_replace(self.stats);
        self.data_points_tx
            .send_replace(Arc::from(self.data_points.as_slice()));
    }

    /// Empties the store, publishes the empty state and returns the points
    /// that were removed.
    pub fn reset(&mut self) -> Vec<DataPoint> {
        self.stats = Stats::default();
        let removed = std::mem::take(&mut self.data_points);
        self.publish();
        removed
    }

    /// Marks the owning layer as registered with its map.
    pub fn set_loaded(&self, loaded: bool) {
        self.loaded_tx.send_replace(loaded);
    }

    /// Subscribes to stats updates.
    #[must_use]
    pub fn subscribe_stats(&self) -> watch::Receiver<Stats> {
        self.stats_tx.subscribe()
    }

    /// Subscribes to data-point snapshots.
    #[must_use]
    pub fn subscribe_data_points(&self) -> watch::Receiver<Arc<[DataPoint]>> {
        self.data_points_tx.subscribe()
    }

    /// Subscribes to the loaded flag.
    #[must_use]
    pub fn subscribe_loaded(&self) -> watch::Receiver<bool> {
        self.loaded_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use eventmap_events_models::EventRecord;

    use super::*;

    fn point(id: u64) -> DataPoint {
        let event: EventRecord = serde_json::from_value(serde_json::json!({"id": id})).unwrap();
        DataPoint {
            geometry: Point::new(0.0, 0.0),
            symbol: MarkerSymbol::default(),
            attributes: TaggedEvent {
                event,
                source_tag: "eventbrite".to_owned(),
            },
        }
    }

    #[test]
    fn publishes_only_on_request() {
        let mut store = ResultsStore::new();
        let stats_rx = store.subscribe_stats();
        let points_rx = store.subscribe_data_points();

        store.record_point(point(1));
        store.record_no_geo();
        assert_eq!(stats_rx.borrow().processed(), 0);

        store.publish();
        assert_eq!(
            *stats_rx.borrow(),
            Stats {
                geo_points: 1,
                geo_names: 0,
                no_geo: 1
            }
        );
        assert_eq!(points_rx.borrow().len(), 1);
        assert_eq!(points_rx.borrow()[0].id().as_str(), "1");
    }

    #[test]
    fn reset_returns_removed_points() {
        let mut store = ResultsStore::new();
        let stats_rx = store.subscribe_stats();
        store.record_point(point(1));
        store.record_point(point(2));
        store.publish();

        let removed = store.reset();
        assert_eq!(removed.len(), 2);
        assert!(store.data_points().is_empty());
        assert_eq!(*stats_rx.borrow(), Stats::default());
    }

    #[test]
    fn loaded_flag_is_observable() {
        let store = ResultsStore::new();
        let loaded = store.subscribe_loaded();
        assert!(!*loaded.borrow());
        store.set_loaded(true);
        assert!(*loaded.borrow());
    }
}
