//! Geometry type definitions

use thiserror::Error;

/// Valid longitude range in degrees.
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// Valid latitude range in degrees.
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// WGS84 sphere radius in meters, matching the radius map providers use for
/// spherical area computation.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Minimum number of points in a closed ring (3 distinct vertices plus the
/// closing point).
pub const MIN_RING_POINTS: usize = 4;

/// A geographic coordinate as a (longitude, latitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    /// Longitude (east-west), degrees
    pub lng: f64,
    /// Latitude (north-south), degrees
    pub lat: f64,
}

impl LngLat {
    /// Create a coordinate from longitude and latitude in degrees.
    #[inline]
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Compare two coordinates within an absolute tolerance in degrees.
    #[inline]
    pub fn approx_eq(&self, other: &LngLat, tolerance: f64) -> bool {
        (self.lng - other.lng).abs() <= tolerance && (self.lat - other.lat).abs() <= tolerance
    }
}

/// Errors that can occur during geometry conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    /// Fewer than 3 distinct vertices; the geometry cannot enclose an area
    /// and must never be sent to the server.
    #[error("degenerate geometry: {distinct} distinct vertices, need at least 3")]
    DegenerateGeometry { distinct: usize },

    /// Longitude outside [-180, 180].
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Latitude outside [-90, 90].
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Render the `west,south,east,north` form used by the read collaborator's
    /// `bbox` query parameter.
    pub fn to_query_param(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}
