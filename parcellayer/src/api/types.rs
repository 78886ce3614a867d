//! Wire model for the parcel collaborator endpoints.
//!
//! The read endpoint serves GeoJSON-shaped features; field names here follow
//! the server's names (`cf_number`, `area_m2`, `geom_geojson`) and are mapped
//! to the internal [`ParcelFeature`] shape on decode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{to_ring, GeomError, GeoRing, LngLat};
use crate::registry::{ParcelFeature, ParcelId};

/// Errors that can occur talking to the parcel endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status; `detail` carries the server message if the
    /// body had one.
    #[error("server returned status {status}{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status {
        status: u16,
        detail: Option<String>,
    },

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Geometry in a response or request was unusable.
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeomError),
}

impl ApiError {
    /// The server-provided message, if any, for user-facing surfaces.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// GeoJSON Polygon geometry on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Outer ring first; holes are not used by this system.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl WireGeometry {
    /// Encode a closed ring as a GeoJSON Polygon.
    pub fn from_ring(ring: &GeoRing) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![ring.points().iter().map(|p| [p.lng, p.lat]).collect()],
        }
    }

    /// Decode the outer ring, enforcing the ring invariants.
    pub fn to_ring(&self) -> Result<GeoRing, ApiError> {
        if self.kind != "Polygon" {
            return Err(ApiError::Decode(format!(
                "unsupported geometry type: {}",
                self.kind
            )));
        }
        let outer = self
            .coordinates
            .first()
            .ok_or_else(|| ApiError::Decode("polygon has no rings".to_string()))?;
        let path: Vec<LngLat> = outer.iter().map(|c| LngLat::new(c[0], c[1])).collect();
        Ok(to_ring(&path)?)
    }
}

/// Per-feature properties on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WireProperties {
    pub id: ParcelId,
    pub name: String,
    #[serde(default)]
    pub cf_number: Option<String>,
    #[serde(default)]
    pub area_m2: Option<f64>,
}

/// One feature from the read endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WireFeature {
    pub properties: WireProperties,
    pub geometry: WireGeometry,
}

impl WireFeature {
    /// Map the server shape into the internal parcel shape.
    pub fn into_feature(self) -> Result<ParcelFeature, ApiError> {
        let ring = self.geometry.to_ring()?;
        Ok(ParcelFeature {
            id: self.properties.id,
            name: self.properties.name,
            cf_reference: self.properties.cf_number,
            area_m2: self.properties.area_m2.unwrap_or(0.0),
            ring,
        })
    }
}

/// Read response body, tolerating an enveloped or bare feature collection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireFeatureCollection {
    /// `{"features": [...]}` — the usual GeoJSON-style envelope.
    Features { features: Vec<WireFeature> },
    /// `{"items": [...]}` — alternate envelope some deployments serve.
    Items { items: Vec<WireFeature> },
    /// Bare top-level array.
    Bare(Vec<WireFeature>),
}

impl WireFeatureCollection {
    /// Decode all features into the internal shape.
    pub fn into_features(self) -> Result<Vec<ParcelFeature>, ApiError> {
        let features = match self {
            WireFeatureCollection::Features { features } => features,
            WireFeatureCollection::Items { items } => items,
            WireFeatureCollection::Bare(features) => features,
        };
        features.into_iter().map(WireFeature::into_feature).collect()
    }
}

/// Creation request body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateParcelRequest {
    pub name: String,
    pub cf_number: String,
    pub geom_geojson: WireGeometry,
}

/// Creation response: assigned identifier plus server-computed area.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CreatedParcel {
    pub id: ParcelId,
    pub area_m2: f64,
}

/// Geometry patch request body.
#[derive(Debug, Clone, Serialize)]
pub struct PatchGeometryRequest {
    pub geom_geojson: WireGeometry,
}

/// Patch response: updated server-computed area.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PatchedParcel {
    pub area_m2: f64,
}

/// Error body shape the server uses for failures.
#[derive(Debug, Deserialize)]
pub struct WireErrorBody {
    pub detail: Option<String>,
}
