//! Parcel identifier to overlay mapping.

use dashmap::DashMap;
use tracing::trace;

use super::NativePolygon;
use crate::registry::ParcelId;

/// Mapping from parcel identifier to its mounted polygon overlay.
///
/// Populated by the host's overlay mount/unmount callbacks and read by the
/// edit session when committing geometry. The concurrent map serializes
/// mount/unmount against a commit running on another runtime thread.
#[derive(Default)]
pub struct PolygonBindings {
    polygons: DashMap<ParcelId, NativePolygon>,
}

impl PolygonBindings {
    /// Create an empty bindings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a parcel's overlay was mounted.
    ///
    /// A remount for the same identifier replaces the previous binding.
    pub fn mount(&self, id: ParcelId, polygon: NativePolygon) {
        trace!(parcel = id, "overlay mounted");
        self.polygons.insert(id, polygon);
    }

    /// Record that a parcel's overlay was unmounted.
    ///
    /// Returns `false` if no overlay was bound for the identifier.
    pub fn unmount(&self, id: ParcelId) -> bool {
        let removed = self.polygons.remove(&id).is_some();
        if removed {
            trace!(parcel = id, "overlay unmounted");
        }
        removed
    }

    /// The overlay currently bound for a parcel, if any.
    pub fn get(&self, id: ParcelId) -> Option<NativePolygon> {
        self.polygons.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of bound overlays.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Whether no overlays are bound.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Drop all bindings (controller detach).
    pub fn clear(&self) {
        self.polygons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::LngLat;

    fn poly() -> NativePolygon {
        NativePolygon::new(vec![
            LngLat::new(26.10, 44.30),
            LngLat::new(26.11, 44.30),
            LngLat::new(26.11, 44.31),
        ])
    }

    #[test]
    fn test_mount_and_lookup() {
        let bindings = PolygonBindings::new();
        bindings.mount(7, poly());

        assert!(bindings.get(7).is_some());
        assert!(bindings.get(8).is_none());
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_unmount_removes_binding() {
        let bindings = PolygonBindings::new();
        bindings.mount(7, poly());

        assert!(bindings.unmount(7));
        assert!(bindings.get(7).is_none());
        assert!(!bindings.unmount(7), "second unmount is a no-op");
    }
}
