//! Native polygon overlay seam
//!
//! Stands in for the map provider's mutable polygon overlays. Each rendered
//! parcel (and the in-progress draft) is backed by a [`NativePolygon`] handle
//! whose vertex path the provider's editing UI mutates; path mutations fire
//! synchronous listeners so sessions can recompute area in arrival order.
//!
//! [`PolygonBindings`] is the shared mapping from parcel identifier to its
//! mounted overlay, fed by the host's mount/unmount callbacks and read by the
//! edit session at commit time.

mod bindings;
mod polygon;

pub use bindings::PolygonBindings;
pub use polygon::{ListenerId, NativePolygon, OverlayError, PathEvent};
