//! Collaborator client traits and the reqwest implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use super::types::{
    ApiError, CreateParcelRequest, CreatedParcel, PatchGeometryRequest, PatchedParcel,
    WireErrorBody, WireFeatureCollection, WireGeometry,
};
use crate::geom::{BoundingBox, GeoRing};
use crate::registry::{ParcelFeature, ParcelId};

/// Boxed future used to keep the collaborator traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read collaborator: parcels intersecting a bounding box.
pub trait ParcelReader: Send + Sync {
    /// Fetch the parcels intersecting `bbox` at the given zoom.
    fn parcels_in_bbox(
        &self,
        bbox: BoundingBox,
        zoom: u8,
    ) -> BoxFuture<'_, Result<Vec<ParcelFeature>, ApiError>>;
}

/// Write collaborator: parcel creation and geometry patches.
pub trait ParcelWriter: Send + Sync {
    /// Create a parcel; the server assigns the identifier and computes area.
    fn create_parcel(
        &self,
        request: CreateParcelRequest,
    ) -> BoxFuture<'_, Result<CreatedParcel, ApiError>>;

    /// Replace a parcel's geometry; the server recomputes area.
    fn patch_geometry(
        &self,
        id: ParcelId,
        ring: &GeoRing,
    ) -> BoxFuture<'_, Result<PatchedParcel, ApiError>>;
}

/// Configuration for the HTTP parcel client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the parcel API, without a trailing slash.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpClientConfig {
    /// Config for the given base URL with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP implementation of the parcel collaborators using reqwest.
#[derive(Clone)]
pub struct HttpParcelClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpParcelClient {
    /// Create a client from configuration.
    pub fn new(config: HttpClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Decode a successful body or map a failure status to [`ApiError`].
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            // Try to pull the server's detail message out of the error body.
            let detail = response
                .json::<WireErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail);
            warn!(status = status.as_u16(), ?detail, "parcel API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl ParcelReader for HttpParcelClient {
    fn parcels_in_bbox(
        &self,
        bbox: BoundingBox,
        zoom: u8,
    ) -> BoxFuture<'_, Result<Vec<ParcelFeature>, ApiError>> {
        Box::pin(async move {
            let url = format!("{}/parcels", self.base_url);
            debug!(bbox = %bbox.to_query_param(), zoom, "fetching parcels");
            let response = self
                .client
                .get(&url)
                .query(&[("bbox", bbox.to_query_param()), ("zoom", zoom.to_string())])
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            let collection: WireFeatureCollection = Self::decode(response).await?;
            collection.into_features()
        })
    }
}

impl ParcelWriter for HttpParcelClient {
    fn create_parcel(
        &self,
        request: CreateParcelRequest,
    ) -> BoxFuture<'_, Result<CreatedParcel, ApiError>> {
        Box::pin(async move {
            let url = format!("{}/parcels", self.base_url);
            debug!(name = %request.name, "creating parcel");
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            Self::decode(response).await
        })
    }

    fn patch_geometry(
        &self,
        id: ParcelId,
        ring: &GeoRing,
    ) -> BoxFuture<'_, Result<PatchedParcel, ApiError>> {
        let body = PatchGeometryRequest {
            geom_geojson: WireGeometry::from_ring(ring),
        };
        Box::pin(async move {
            let url = format!("{}/parcels/{id}", self.base_url);
            debug!(parcel = id, "patching parcel geometry");
            let response = self
                .client
                .patch(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            Self::decode(response).await
        })
    }
}
