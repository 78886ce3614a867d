//! Parcel collaborator boundary
//!
//! Wire model and client traits for the three out-of-scope server endpoints
//! this engine talks to: read parcels in a bounding box, create a parcel, and
//! patch a parcel's geometry. Traits are object-safe (boxed futures) so tests
//! can inject mock collaborators.

mod client;
mod types;

pub use client::{BoxFuture, HttpClientConfig, HttpParcelClient, ParcelReader, ParcelWriter};
pub use types::{
    ApiError, CreateParcelRequest, CreatedParcel, PatchGeometryRequest, PatchedParcel,
    WireErrorBody, WireFeature, WireFeatureCollection, WireGeometry, WireProperties,
};
