#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event search types shared across the event map crates.
//!
//! [`SearchQuery`] is the parameter set sent to the event-search endpoint,
//! [`SearchResponse`] is its JSON body, and [`EventRecord`] is a single raw
//! event as returned by the API. Unknown fields on events and venues are
//! preserved so that marker attributes carry the full record.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};

/// Unit used for the search radius (`within_unit`).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RadiusUnit {
    /// Statute miles.
    #[default]
    #[serde(rename = "M")]
    #[strum(serialize = "M")]
    Miles,
    /// Kilometres.
    #[serde(rename = "K")]
    #[strum(serialize = "K")]
    Kilometers,
}

/// Query parameters for one page of an event search.
///
/// Field names match the remote API's query-string parameters, so the
/// struct can be handed directly to `reqwest::RequestBuilder::query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// API credential.
    pub app_key: String,
    /// Free-text search filter.
    pub keywords: String,
    /// Search radius around the center point.
    pub within: u32,
    /// Unit of [`within`](Self::within).
    pub within_unit: RadiusUnit,
    /// Center latitude (WGS84).
    pub latitude: f64,
    /// Center longitude (WGS84).
    pub longitude: f64,
    /// 1-based page number.
    pub page: u32,
    /// Maximum results per page.
    pub max: u32,
}

/// Unique identifier of an event.
///
/// The API reports ids as JSON numbers, but strings are accepted too; both
/// normalise to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Creates an id from its textual form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

/// Venue attached to an event. Coordinates are kept as raw JSON because the
/// API sends them as strings, numbers or empty values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Raw latitude value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Value>,
    /// Raw longitude value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Value>,
    /// Any other venue fields (name, address, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of reading a venue's coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VenueCoordinates {
    /// The venue carries no usable latitude.
    Absent,
    /// A latitude was present but one of the axes failed to parse.
    Invalid,
    /// Both axes parsed as numbers.
    Valid {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
}

impl Venue {
    /// Interprets the raw coordinate values.
    ///
    /// A latitude counts as present when it is a non-empty string, a
    /// non-zero number or `true`. Once present, both axes are read as the
    /// longest numeric prefix of their text; an axis with no numeric prefix
    /// or a non-finite value yields [`VenueCoordinates::Invalid`].
    #[must_use]
    pub fn coordinates(&self) -> VenueCoordinates {
        if !self.latitude.as_ref().is_some_and(is_truthy) {
            return VenueCoordinates::Absent;
        }

        let latitude = self.latitude.as_ref().map_or(f64::NAN, parse_coordinate);
        let longitude = self.longitude.as_ref().map_or(f64::NAN, parse_coordinate);

        if !latitude.is_finite() || !longitude.is_finite() {
            VenueCoordinates::Invalid
        } else {
            VenueCoordinates::Valid {
                latitude,
                longitude,
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parses a coordinate value, returning NaN when it is not numeric.
fn parse_coordinate(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_float_prefix(s),
        _ => f64::NAN,
    }
}

/// Parses the longest decimal prefix of `s` (after leading whitespace), so
/// `"-74.0060,"` reads as `-74.006`. Returns NaN when there is no digit.
fn parse_float_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_start = end;
    while is_digit(end) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let mut frac_end = end + 1;
        while is_digit(frac_end) {
            frac_end += 1;
        }
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while is_digit(exp_end) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Reads an optional display string, tolerating numbers and dropping any
/// other JSON type instead of failing the whole record.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads a venue, treating anything that is not an object as no venue.
fn lenient_venue<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Venue>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

/// Reads a count sent as a number or a numeric string; anything else is 0.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// A raw event as returned by the search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event identifier (used for deduplication).
    pub id: EventId,
    /// Event title.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// HTML description.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    /// Event page URL.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    /// Logo image URL.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub logo: Option<String>,
    /// Hex colour for the popup background.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub box_background_color: Option<String>,
    /// Hex colour for the popup border.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub box_border_color: Option<String>,
    /// Hex colour for the popup text.
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub box_text_color: Option<String>,
    /// Where the event takes place, if known.
    #[serde(
        default,
        deserialize_with = "lenient_venue",
        skip_serializing_if = "Option::is_none"
    )]
    pub venue: Option<Venue>,
    /// Every other field the API sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventRecord {
    /// Returns the venue coordinates, treating a missing venue as
    /// [`VenueCoordinates::Absent`].
    #[must_use]
    pub fn venue_coordinates(&self) -> VenueCoordinates {
        self.venue
            .as_ref()
            .map_or(VenueCoordinates::Absent, Venue::coordinates)
    }
}

/// Result-set summary reported alongside a page of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Total number of events matching the query.
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_items: u64,
    /// Number of events reported as shown so far.
    #[serde(default, deserialize_with = "lenient_count")]
    pub num_showing: u64,
}

impl Summary {
    /// Whether the API reports results beyond those already shown.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.total_items != self.num_showing
    }
}

/// One element of the response's `events` array. The API mixes a summary
/// entry with event entries in the same array.
///
/// Entries decode independently: an entry whose event cannot be read keeps
/// the reason in [`rejected`](Self::rejected) and leaves the rest of the
/// page intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchEntry {
    /// The event, if this entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventRecord>,
    /// The summary, if this entry carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    /// Why the entry's event could not be decoded.
    #[serde(skip)]
    pub rejected: Option<String>,
}

impl SearchEntry {
    /// An entry carrying `event`.
    #[must_use]
    pub const fn with_event(event: EventRecord) -> Self {
        Self {
            event: Some(event),
            summary: None,
            rejected: None,
        }
    }

    /// An entry carrying `summary`.
    #[must_use]
    pub const fn with_summary(summary: Summary) -> Self {
        Self {
            event: None,
            summary: Some(summary),
            rejected: None,
        }
    }

    /// Decodes one raw entry without failing.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Self {
                    rejected: Some(format!("entry is not an object: {other}")),
                    ..Self::default()
                };
            }
        };

        let mut entry = Self {
            summary: fields
                .remove("summary")
                .and_then(|summary| serde_json::from_value(summary).ok()),
            ..Self::default()
        };

        match fields.remove("event") {
            None | Some(Value::Null) => {}
            Some(raw) => match serde_json::from_value::<EventRecord>(raw) {
                Ok(event) => entry.event = Some(event),
                Err(e) => entry.rejected = Some(e.to_string()),
            },
        }

        entry
    }
}

impl<'de> Deserialize<'de> for SearchEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// JSON body of an event-search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Page entries; empty when nothing matched.
    #[serde(default)]
    pub events: Vec<SearchEntry>,
    /// Application-level error reported by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl SearchResponse {
    /// Returns the first summary found in the page's entries.
    #[must_use]
    pub fn summary(&self) -> Option<&Summary> {
        self.events.iter().find_map(|entry| entry.summary.as_ref())
    }

    /// Renders the application error, if any, as a human-readable message.
    ///
    /// Object-shaped errors are rendered from their `error_type` and
    /// `error_message` fields.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        Some(match error {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            Value::Object(obj) => {
                let kind = obj.get("error_type").and_then(Value::as_str);
                let message = obj.get("error_message").and_then(Value::as_str);
                match (kind, message) {
                    (Some(kind), Some(message)) => format!("{kind}: {message}"),
                    (None, Some(message)) => message.to_owned(),
                    (Some(kind), None) => kind.to_owned(),
                    (None, None) => error.to_string(),
                }
            }
            other => other.to_string(),
        })
    }
}

/// An event record tagged with the layer that produced it. This is the
/// attribute payload attached to each marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedEvent {
    /// The raw event.
    pub event: EventRecord,
    /// Identifier of the producing layer.
    pub source_tag: String,
}
