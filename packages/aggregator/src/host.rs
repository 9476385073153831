//! The host map the aggregator draws onto.
//!
//! The aggregator never renders anything itself. It asks the host for the
//! current viewport and hands it marker edits for a single feature layer.

use eventmap_events_models::EventId;
use eventmap_geography::Extent;
use tokio::sync::watch;

use crate::config::MarkerSymbol;
use crate::store::DataPoint;

/// Description of the feature layer registered with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDefinition {
    /// Layer identifier.
    pub id: String,
    /// Initial visibility.
    pub visible: bool,
    /// Symbol every marker on the layer uses.
    pub symbol: MarkerSymbol,
}

/// A batch of changes to a layer's markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerEdits {
    /// Markers to add.
    pub adds: Vec<DataPoint>,
    /// Ids of markers to remove.
    pub deletes: Vec<EventId>,
}

impl LayerEdits {
    /// An additive edit.
    #[must_use]
    pub const fn additions(adds: Vec<DataPoint>) -> Self {
        Self {
            adds,
            deletes: Vec::new(),
        }
    }

    /// A removal edit.
    #[must_use]
    pub const fn removals(deletes: Vec<EventId>) -> Self {
        Self {
            adds: Vec::new(),
            deletes,
        }
    }

    /// Whether the edit changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty()
    }
}

/// Operations the aggregator needs from the map it is attached to.
///
/// Implementations are called while the aggregator holds its state lock and
/// must not call back into the aggregator.
pub trait MapHost: Send + Sync {
    /// The current viewport.
    fn extent(&self) -> Extent;

    /// A channel that changes whenever the viewport does.
    fn subscribe_extent(&self) -> watch::Receiver<Extent>;

    /// Registers a feature layer.
    fn add_layer(&self, layer: &LayerDefinition);

    /// Applies marker additions and removals to a layer.
    fn apply_edits(&self, layer_id: &str, edits: LayerEdits);

    /// Shows or hides a layer.
    fn set_layer_visibility(&self, layer_id: &str, visible: bool);

    /// Closes the map's popup if one is open.
    fn hide_info_window(&self) {}
}
