//! Conversions between geographic coordinates and map display coordinates.
//!
//! Only spherical Web Mercator is supported as a projected system, which is
//! what tiled web maps render in.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::Point;

use crate::SpatialReference;

/// Semi-major axis of the WGS84 ellipsoid, used as the sphere radius for
/// Web Mercator.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator diverges; inputs are clamped to it.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_6;

/// Projects a longitude/latitude point (degrees) to Web Mercator metres.
#[must_use]
pub fn geographic_to_web_mercator(point: Point<f64>) -> Point<f64> {
    let lat = point
        .y()
        .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
        .to_radians();
    let x = point.x().to_radians() * EARTH_RADIUS_METERS;
    let y = (FRAC_PI_4 + lat / 2.0).tan().ln() * EARTH_RADIUS_METERS;
    Point::new(x, y)
}

/// Inverse of [`geographic_to_web_mercator`].
#[must_use]
pub fn web_mercator_to_geographic(point: Point<f64>) -> Point<f64> {
    let lon = (point.x() / EARTH_RADIUS_METERS).to_degrees();
    let lat = (2.0 * (point.y() / EARTH_RADIUS_METERS).exp().atan() - FRAC_PI_2).to_degrees();
    Point::new(lon, lat)
}

/// Converts a point in `sr` to geographic longitude/latitude.
#[must_use]
pub fn to_geographic(point: Point<f64>, sr: SpatialReference) -> Point<f64> {
    match sr {
        SpatialReference::Wgs84 => point,
        SpatialReference::WebMercator => web_mercator_to_geographic(point),
    }
}

/// Converts a geographic point into the display coordinates of `sr`.
#[must_use]
pub fn to_display(point: Point<f64>, sr: SpatialReference) -> Point<f64> {
    match sr {
        SpatialReference::Wgs84 => point,
        SpatialReference::WebMercator => geographic_to_web_mercator(point),
    }
}
