//! Deduplication and geo-classification of search results.
//!
//! Every event id is processed at most once per session. A first sighting is
//! either placed on the map (valid venue coordinates, projected into the
//! map's display spatial reference) or counted as un-locatable.

use std::collections::BTreeSet;

use eventmap_events_models::{EventId, EventRecord, SearchEntry, TaggedEvent, VenueCoordinates};
use eventmap_geography::{SpatialReference, projection};
use geo::Point;

use crate::config::MarkerSymbol;
use crate::store::{DataPoint, ResultsStore};

/// How a single event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Already seen this session; nothing changed.
    Duplicate,
    /// Placed on the map.
    Located(DataPoint),
    /// Latitude present but an axis failed to parse.
    InvalidCoordinates,
    /// No venue coordinates at all.
    NoCoordinates,
}

/// Tracks seen ids and turns event records into classifications.
#[derive(Debug)]
pub struct Classifier {
    seen: BTreeSet<EventId>,
    source_tag: String,
    symbol: MarkerSymbol,
}

impl Classifier {
    /// Creates a classifier that tags events with `source_tag` and gives
    /// placed events `symbol`.
    #[must_use]
    pub const fn new(source_tag: String, symbol: MarkerSymbol) -> Self {
        Self {
            seen: BTreeSet::new(),
            source_tag,
            symbol,
        }
    }

    /// Number of distinct ids seen since the last clear.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Forgets every seen id.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Classifies one event, marking its id as seen.
    pub fn classify(&mut self, event: &EventRecord, display: SpatialReference) -> Classification {
        if !self.seen.insert(event.id.clone()) {
            return Classification::Duplicate;
        }

        match event.venue_coordinates() {
            VenueCoordinates::Absent => Classification::NoCoordinates,
            VenueCoordinates::Invalid => Classification::InvalidCoordinates,
            VenueCoordinates::Valid {
                latitude,
                longitude,
            } => Classification::Located(DataPoint {
                geometry: projection::to_display(Point::new(longitude, latitude), display),
                symbol: self.symbol.clone(),
                attributes: TaggedEvent {
                    event: event.clone(),
                    source_tag: self.source_tag.clone(),
                },
            }),
        }
    }
}

/// Summary of one processed page.
#[derive(Debug, Default)]
pub struct PageBatch {
    /// Newly placed points, in page order.
    pub added: Vec<DataPoint>,
    /// Entries skipped because their id was already seen.
    pub duplicates: usize,
    /// Entries counted as un-locatable.
    pub no_geo: usize,
    /// Entries whose event could not be decoded and were skipped.
    pub rejected: usize,
}

/// Classifies every event entry of a page into `store`.
///
/// Entries that carry no event (the summary entry) are ignored, as are
/// entries whose event could not be decoded. The store is updated but not
/// published.
pub fn process_page(
    classifier: &mut Classifier,
    store: &mut ResultsStore,
    entries: &[SearchEntry],
    display: SpatialReference,
) -> PageBatch {
    let mut batch = PageBatch::default();

    for entry in entries {
        let Some(event) = &entry.event else {
            if let Some(reason) = &entry.rejected {
                log::warn!("Skipping undecodable event entry: {reason}");
                batch.rejected += 1;
            }
            continue;
        };

        match classifier.classify(event, display) {
            Classification::Duplicate => batch.duplicates += 1,
            Classification::Located(point) => {
                batch.added.push(point.clone());
                store.record_point(point);
            }
            Classification::InvalidCoordinates => {
                log::debug!("Event {} has unparseable venue coordinates", event.id);
                batch.no_geo += 1;
                store.record_no_geo();
            }
            Classification::NoCoordinates => {
                batch.no_geo += 1;
                store.record_no_geo();
            }
        }
    }

    batch
}
