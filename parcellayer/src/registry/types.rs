//! Parcel model types.

use crate::geom::GeoRing;

/// Server-assigned parcel identifier.
pub type ParcelId = i64;

/// Cadastral reference sentinel used when no reference is known.
pub const UNKNOWN_REFERENCE: &str = "NECUNOSCUT";

/// A persisted land parcel as known to the mapping view.
///
/// Created via draft commit or server-side import, always carrying a
/// server-assigned identifier and server-computed area. The in-progress state
/// of an unpersisted draft lives in the draft session instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelFeature {
    /// Server-assigned identifier.
    pub id: ParcelId,
    /// Display name.
    pub name: String,
    /// Cadastral reference code, if known.
    pub cf_reference: Option<String>,
    /// Server-computed area in square meters.
    pub area_m2: f64,
    /// Closed boundary ring.
    pub ring: GeoRing,
}
