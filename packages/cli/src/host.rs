//! A headless [`MapHost`] for the terminal.
//!
//! The viewport is fixed to the bounding box given on the command line and
//! marker edits are logged and tallied instead of drawn.

use std::sync::atomic::{AtomicUsize, Ordering};

use eventmap_aggregator::host::{LayerDefinition, LayerEdits, MapHost};
use eventmap_geography::Extent;
use tokio::sync::watch;

pub struct ConsoleMapHost {
    extent_tx: watch::Sender<Extent>,
    markers: AtomicUsize,
}

impl ConsoleMapHost {
    #[must_use]
    pub fn new(extent: Extent) -> Self {
        Self {
            extent_tx: watch::channel(extent).0,
            markers: AtomicUsize::new(0),
        }
    }

    /// Markers currently on the layer.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.load(Ordering::SeqCst)
    }
}

impl MapHost for ConsoleMapHost {
    fn extent(&self) -> Extent {
        *self.extent_tx.borrow()
    }

    fn subscribe_extent(&self) -> watch::Receiver<Extent> {
        self.extent_tx.subscribe()
    }

    fn add_layer(&self, layer: &LayerDefinition) {
        log::debug!(
            "Layer '{}' added (symbol {} {}x{})",
            layer.id,
            layer.symbol.url,
            layer.symbol.width,
            layer.symbol.height
        );
    }

    fn apply_edits(&self, layer_id: &str, edits: LayerEdits) {
        for point in &edits.adds {
            log::debug!(
                "{layer_id}: + {} {}",
                point.id(),
                point.attributes.event.title.as_deref().unwrap_or("(untitled)")
            );
        }
        if !edits.deletes.is_empty() {
            log::debug!("{layer_id}: - {} marker(s)", edits.deletes.len());
        }

        self.markers.fetch_add(edits.adds.len(), Ordering::SeqCst);
        let _ = self
            .markers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(edits.deletes.len()))
            });
    }

    fn set_layer_visibility(&self, layer_id: &str, visible: bool) {
        log::debug!("{layer_id}: visible = {visible}");
    }
}
