//! Scripted fakes for the event source and host map.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventmap_events_models::{SearchEntry, SearchQuery, SearchResponse, Summary};
use eventmap_geography::Extent;
use eventmap_source::{EventSource, SourceError};
use serde_json::{Value, json};
use tokio::sync::{Notify, broadcast, watch};

use crate::host::{LayerDefinition, LayerEdits, MapHost};
use crate::notify::Notification;

/// One scripted answer.
pub enum Reply {
    Page(SearchResponse),
    /// A transport-level failure.
    Fail,
    /// Never resolves.
    Hang,
    /// Resolves with the page once the gate is notified.
    Gated(Arc<Notify>, SearchResponse),
}

/// Answers searches from a fixed script and records every query.
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Reply>>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        self.queries.lock().unwrap().push(query.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Page(SearchResponse::default()));

        match reply {
            Reply::Page(response) => Ok(response),
            Reply::Fail => Err(serde_json::from_str::<Value>("<html>").unwrap_err().into()),
            Reply::Hang => std::future::pending().await,
            Reply::Gated(gate, response) => {
                gate.notified().await;
                Ok(response)
            }
        }
    }
}

/// A map with a fixed Web Mercator viewport that records everything done
/// to it.
pub struct RecordingHost {
    extent_tx: watch::Sender<Extent>,
    pub layers: Mutex<Vec<LayerDefinition>>,
    pub edits: Mutex<Vec<(String, LayerEdits)>>,
    pub visibility: Mutex<Vec<bool>>,
    pub info_window_hides: AtomicUsize,
}

impl RecordingHost {
    /// Roughly 10 km square around lower Manhattan.
    pub fn new() -> Arc<Self> {
        Self::with_extent(Extent::from_geographic_bounds(-74.06, 40.68, -73.94, 40.77))
    }

    pub fn with_extent(extent: Extent) -> Arc<Self> {
        Arc::new(Self {
            extent_tx: watch::channel(extent).0,
            layers: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            visibility: Mutex::new(Vec::new()),
            info_window_hides: AtomicUsize::new(0),
        })
    }

    pub fn set_extent(&self, extent: Extent) {
        self.extent_tx.send_replace(extent);
    }

    pub fn edits(&self) -> Vec<LayerEdits> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, edits)| edits.clone())
            .collect()
    }

    pub fn info_window_hides(&self) -> usize {
        self.info_window_hides.load(Ordering::SeqCst)
    }
}

impl MapHost for RecordingHost {
    fn extent(&self) -> Extent {
        *self.extent_tx.borrow()
    }

    fn subscribe_extent(&self) -> watch::Receiver<Extent> {
        self.extent_tx.subscribe()
    }

    fn add_layer(&self, layer: &LayerDefinition) {
        self.layers.lock().unwrap().push(layer.clone());
    }

    fn apply_edits(&self, layer_id: &str, edits: LayerEdits) {
        self.edits
            .lock()
            .unwrap()
            .push((layer_id.to_owned(), edits));
    }

    fn set_layer_visibility(&self, _layer_id: &str, visible: bool) {
        self.visibility.lock().unwrap().push(visible);
    }

    fn hide_info_window(&self) {
        self.info_window_hides.fetch_add(1, Ordering::SeqCst);
    }
}

/// An event whose venue sits in lower Manhattan.
pub fn located(id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Event {id}"),
        "venue": {"latitude": "40.7128", "longitude": "-74.0060"}
    })
}

/// An event with an empty venue.
pub fn unlocated(id: u64) -> Value {
    json!({"id": id, "title": format!("Event {id}"), "venue": {}})
}

/// A page led by its summary entry, the way the API lays it out.
pub fn page(total_items: u64, num_showing: u64, events: &[Value]) -> SearchResponse {
    let mut entries = vec![SearchEntry::with_summary(Summary {
        total_items,
        num_showing,
    })];
    entries.extend(events.iter().cloned().map(|event| {
        SearchEntry::from_value(json!({ "event": event }))
    }));
    SearchResponse {
        events: entries,
        error: None,
    }
}

/// Every notification received so far.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}
