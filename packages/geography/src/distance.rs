//! Distance between two points expressed in a map's spatial reference.

use geo::Point;

use crate::SpatialReference;

/// Mean earth radius used for great-circle distances.
const MEAN_EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Feet per metre, as used when converting map lengths to miles.
pub const FEET_PER_METER: f64 = 3.281;

/// Feet per statute mile.
pub const FEET_PER_MILE: f64 = 5280.0;

/// Length in metres of the segment between `a` and `b`, both given in `sr`.
///
/// Web Mercator lengths are planar, matching how web map toolkits measure
/// on screen. Geographic inputs use the haversine great-circle distance.
#[must_use]
pub fn length(a: Point<f64>, b: Point<f64>, sr: SpatialReference) -> f64 {
    match sr {
        SpatialReference::WebMercator => (b.x() - a.x()).hypot(b.y() - a.y()),
        SpatialReference::Wgs84 => haversine_meters(a, b),
    }
}

/// Haversine great-circle distance in metres between two lon/lat points.
#[must_use]
pub fn haversine_meters(a: Point<f64>, b: Point<f64>) -> f64 {
    let dlat = (b.y() - a.y()).to_radians();
    let dlng = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.y().to_radians().cos() * b.y().to_radians().cos() * (dlng / 2.0).sin().powi(2);

    2.0 * MEAN_EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Converts metres to statute miles via feet.
#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters * FEET_PER_METER / FEET_PER_MILE
}
