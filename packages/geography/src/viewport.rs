//! Translates a map viewport into a search center and radius.

use eventmap_events_models::RadiusUnit;
use geo::Point;

use crate::{Extent, distance, projection};

/// Largest search radius, in miles, requested when no other cap is set.
pub const DEFAULT_MAX_RADIUS: f64 = 600.0;

/// Search area derived from a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    /// Radius in [`units`](Self::units), never above the configured cap.
    pub radius: u32,
    /// Geographic (lon/lat) center of the viewport.
    pub center: Point<f64>,
    /// Unit of [`radius`](Self::radius). Always miles.
    pub units: RadiusUnit,
}

/// Derives the search area for `extent`.
///
/// The radius is half the west-to-east span measured along the extent's
/// vertical midpoint, converted to miles, rounded up and clamped to
/// `[0, max_radius]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn search_area(extent: &Extent, max_radius: f64) -> SearchArea {
    let sr = extent.spatial_reference();
    let center = extent.center();
    let west = Point::new(extent.min().x(), center.y());
    let east = Point::new(extent.max().x(), center.y());

    let span_miles = distance::meters_to_miles(distance::length(west, east, sr));
    let radius = (span_miles / 2.0).ceil().min(max_radius).max(0.0);

    log::trace!("viewport span {span_miles:.2} mi, radius {radius} mi");

    SearchArea {
        radius: radius as u32,
        center: projection::to_geographic(center, sr),
        units: RadiusUnit::Miles,
    }
}
