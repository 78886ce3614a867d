//! Geometry conversion module
//!
//! Converts between the map provider's ordered open vertex paths and closed
//! geographic rings, and computes spherical polygon area from a ring.
//! Coordinates are (longitude, latitude) pairs in degrees.

mod types;


pub use types::{
    BoundingBox, GeomError, LngLat, EARTH_RADIUS_M, MAX_LAT, MAX_LNG, MIN_LAT, MIN_LNG,
    MIN_RING_POINTS,
};

/// Square meters per hectare, for display conversion.
pub const M2_PER_HECTARE: f64 = 10_000.0;

/// A closed geographic ring: an ordered sequence of coordinates whose first
/// and last points are identical.
///
/// Construction goes through [`to_ring`], which enforces the closure invariant
/// and rejects degenerate input, so any `GeoRing` in circulation is closed and
/// has at least 3 distinct vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRing {
    points: Vec<LngLat>,
}

impl GeoRing {
    /// All points including the closing point (first == last).
    #[inline]
    pub fn points(&self) -> &[LngLat] {
        &self.points
    }

    /// The open vertex path: every point except the closing one, in order.
    ///
    /// This is the representation native polygon overlays edit.
    pub fn open_path(&self) -> Vec<LngLat> {
        self.points[..self.points.len() - 1].to_vec()
    }

    /// Number of distinct vertices (excludes the closing point).
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Axis-aligned bounding box of the ring.
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
        };
        for p in &self.points {
            bbox.west = bbox.west.min(p.lng);
            bbox.east = bbox.east.max(p.lng);
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
        }
        bbox
    }
}

/// Converts an ordered vertex path into a closed ring.
///
/// The path may be open (last vertex differs from the first) or already
/// closed; closing is idempotent, so a closed input is never double-closed.
/// Vertex order is preserved.
///
/// # Errors
///
/// Returns [`GeomError::DegenerateGeometry`] if the path has fewer than 3
/// distinct vertices, and a range error if any coordinate is outside valid
/// longitude/latitude bounds.
pub fn to_ring(path: &[LngLat]) -> Result<GeoRing, GeomError> {
    for p in path {
        if !(MIN_LNG..=MAX_LNG).contains(&p.lng) {
            return Err(GeomError::InvalidLongitude(p.lng));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&p.lat) {
            return Err(GeomError::InvalidLatitude(p.lat));
        }
    }

    let distinct = count_distinct(path);
    if distinct < 3 {
        return Err(GeomError::DegenerateGeometry { distinct });
    }

    let mut points = path.to_vec();
    // Append the closing point only if the path is still open.
    let first = points[0];
    let last = points[points.len() - 1];
    if first != last {
        points.push(first);
    }

    debug_assert!(points.len() >= MIN_RING_POINTS);
    Ok(GeoRing { points })
}

/// Converts a closed ring back into the open vertex path native polygon
/// overlays use, preserving order.
pub fn to_native_path(ring: &GeoRing) -> Vec<LngLat> {
    ring.open_path()
}

/// Computes the area enclosed by a ring in square meters.
///
/// Uses the spherical excess formula on the WGS84 sphere rather than a planar
/// shoelace, because coordinates are geographic degrees. The result matches
/// the map provider's `spherical.computeArea` within floating-point tolerance.
pub fn compute_area(ring: &GeoRing) -> f64 {
    let path = &ring.points[..ring.points.len() - 1];
    let n = path.len();

    let mut sum = 0.0;
    for i in 0..n {
        let p1 = path[i];
        let p2 = path[(i + 1) % n];
        sum += (p2.lng - p1.lng).to_radians()
            * (2.0 + p1.lat.to_radians().sin() + p2.lat.to_radians().sin());
    }

    (sum * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

/// Converts square meters to hectares for display.
#[inline]
pub fn area_hectares(area_m2: f64) -> f64 {
    area_m2 / M2_PER_HECTARE
}

/// Counts distinct vertices in a path, treating a trailing closing point as a
/// repeat of the first vertex.
fn count_distinct(path: &[LngLat]) -> usize {
    let mut distinct: Vec<LngLat> = Vec::with_capacity(path.len());
    for p in path {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    distinct.len()
}
