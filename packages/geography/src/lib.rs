#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial references, map extents and the geometry helpers the event map
//! needs on top of them.
//!
//! A host map reports its viewport as an [`Extent`] in its own
//! [`SpatialReference`]. [`viewport::search_area`] turns that into a center
//! point and radius for the event-search API, and [`projection`] moves
//! points between geographic coordinates and the map's display
//! coordinates.

pub mod distance;
pub mod projection;
pub mod viewport;

use geo::{Coord, Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during geography operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The well-known id does not name a supported spatial reference.
    #[error("Unsupported spatial reference wkid: {0}")]
    UnsupportedWkid(u32),
}

/// Coordinate system a map renders in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialReference {
    /// Geographic longitude/latitude in degrees (EPSG:4326).
    Wgs84,
    /// Spherical Web Mercator in metres (EPSG:3857).
    WebMercator,
}

impl SpatialReference {
    /// Resolves a well-known id, accepting the legacy aliases hosts still
    /// report for Web Mercator.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedWkid`] for any other id.
    pub const fn from_wkid(wkid: u32) -> Result<Self, GeoError> {
        match wkid {
            4326 => Ok(Self::Wgs84),
            3857 | 102_100 | 102_113 | 900_913 => Ok(Self::WebMercator),
            other => Err(GeoError::UnsupportedWkid(other)),
        }
    }

    /// Returns the canonical well-known id.
    #[must_use]
    pub const fn wkid(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }
}

/// The visible bounding box of a map in its native spatial reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    rect: Rect<f64>,
    spatial_reference: SpatialReference,
}

impl Extent {
    /// Creates an extent from its corner coordinates. Corners may be given
    /// in any order.
    #[must_use]
    pub fn new(
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            rect: Rect::new(Coord { x: xmin, y: ymin }, Coord { x: xmax, y: ymax }),
            spatial_reference,
        }
    }

    /// Builds a Web Mercator extent covering a geographic bounding box.
    #[must_use]
    pub fn from_geographic_bounds(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    ) -> Self {
        let min = projection::geographic_to_web_mercator(Point::new(min_lon, min_lat));
        let max = projection::geographic_to_web_mercator(Point::new(max_lon, max_lat));
        Self::new(
            min.x(),
            min.y(),
            max.x(),
            max.y(),
            SpatialReference::WebMercator,
        )
    }

    /// The spatial reference the extent is expressed in.
    #[must_use]
    pub const fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    /// Lower-left corner.
    #[must_use]
    pub fn min(&self) -> Point<f64> {
        self.rect.min().into()
    }

    /// Upper-right corner.
    #[must_use]
    pub fn max(&self) -> Point<f64> {
        self.rect.max().into()
    }

    /// Centroid of the extent, in the extent's spatial reference.
    #[must_use]
    pub fn center(&self) -> Point<f64> {
        self.rect.center().into()
    }

    /// Width in native map units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.rect.width()
    }
}
