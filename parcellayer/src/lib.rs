//! Parcellayer - parcel geometry editing and viewport synchronization
//!
//! This library is the headless core of a satellite mapping view for land
//! parcels: it lets a host application draw, select, and edit parcel
//! boundaries, computes live spherical area from geographic coordinates, and
//! keeps a client-side cache of visible parcels synchronized with the server
//! as the viewport moves. At most one parcel is ever being edited and at most
//! one viewport fetch is ever in flight.
//!
//! # High-Level API
//!
//! The [`controller`] module provides the single entry point a host embeds:
//!
//! ```ignore
//! use std::sync::Arc;
//! use parcellayer::api::{HttpClientConfig, HttpParcelClient};
//! use parcellayer::controller::{ControllerConfig, MapController};
//!
//! let client = Arc::new(HttpParcelClient::new(HttpClientConfig::new("https://farm.example/api"))?);
//! let mut controller = MapController::attach(
//!     surface,            // host's MapSurface implementation
//!     client.clone(),     // read collaborator
//!     client,             // write collaborator
//!     ControllerConfig::default(),
//! );
//!
//! // Route map-provider callbacks into the controller:
//! controller.on_map_idle();
//! ```

pub mod api;
pub mod controller;
pub mod fetch;
pub mod geom;
pub mod overlay;
pub mod registry;
pub mod session;
pub mod viewport;

/// Version of the parcellayer library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
