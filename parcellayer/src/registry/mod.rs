//! Parcel registry module
//!
//! Client-side authoritative cache of the parcels currently visible in the
//! mapping view. Holds only the window covered by the last successful
//! viewport fetch plus any just-committed parcels; the server remains the
//! durable store.

mod types;

pub use types::{ParcelFeature, ParcelId, UNKNOWN_REFERENCE};

use std::collections::HashSet;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::geom::GeoRing;

/// Cache of the currently visible parcels, keyed by identifier.
///
/// Insertion order is preserved so overlays render in a stable order.
/// Identifiers are unique within the visible set.
#[derive(Default)]
pub struct ParcelRegistry {
    visible: RwLock<Vec<ParcelFeature>>,
}

impl ParcelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire visible set with a fetch response.
    ///
    /// Duplicate identifiers in the input are dropped (first occurrence wins)
    /// to uphold the uniqueness invariant.
    pub fn replace_visible(&self, features: Vec<ParcelFeature>) {
        let mut seen = HashSet::with_capacity(features.len());
        let mut unique = Vec::with_capacity(features.len());
        for feature in features {
            if seen.insert(feature.id) {
                unique.push(feature);
            } else {
                warn!(parcel = feature.id, "duplicate identifier in fetch response, dropped");
            }
        }
        debug!(count = unique.len(), "visible set replaced");
        *self.visible.write().unwrap() = unique;
    }

    /// Insert or replace a single parcel by identifier.
    ///
    /// Used after create/edit commits; an identifier not currently present is
    /// appended, which keeps just-created parcels visible even when they fall
    /// outside the last fetched viewport.
    pub fn upsert(&self, feature: ParcelFeature) {
        let mut visible = self.visible.write().unwrap();
        match visible.iter_mut().find(|f| f.id == feature.id) {
            Some(existing) => *existing = feature,
            None => visible.push(feature),
        }
    }

    /// Look up a parcel by identifier.
    pub fn by_id(&self, id: ParcelId) -> Option<ParcelFeature> {
        self.visible
            .read()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned()
    }

    /// Apply a committed geometry edit to the cached entry.
    ///
    /// Returns the updated feature, or `None` if the parcel is no longer in
    /// the visible set.
    pub fn update_geometry(
        &self,
        id: ParcelId,
        ring: GeoRing,
        area_m2: f64,
    ) -> Option<ParcelFeature> {
        let mut visible = self.visible.write().unwrap();
        let feature = visible.iter_mut().find(|f| f.id == id)?;
        feature.ring = ring;
        feature.area_m2 = area_m2;
        Some(feature.clone())
    }

    /// Snapshot of the visible set in insertion order.
    pub fn visible(&self) -> Vec<ParcelFeature> {
        self.visible.read().unwrap().clone()
    }

    /// Number of visible parcels.
    pub fn len(&self) -> usize {
        self.visible.read().unwrap().len()
    }

    /// Whether the visible set is empty.
    pub fn is_empty(&self) -> bool {
        self.visible.read().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{to_ring, LngLat};

    fn feature(id: ParcelId, name: &str) -> ParcelFeature {
        let ring = to_ring(&[
            LngLat::new(26.10, 44.30),
            LngLat::new(26.11, 44.30),
            LngLat::new(26.11, 44.31),
        ])
        .unwrap();
        ParcelFeature {
            id,
            name: name.to_string(),
            cf_reference: Some("CF123".to_string()),
            area_m2: 1000.0,
            ring,
        }
    }

    #[test]
    fn test_replace_visible_overwrites_previous_set() {
        let registry = ParcelRegistry::new();
        registry.replace_visible(vec![feature(1, "a"), feature(2, "b")]);
        registry.replace_visible(vec![feature(3, "c")]);

        assert_eq!(registry.len(), 1);
        assert!(registry.by_id(1).is_none());
        assert_eq!(registry.by_id(3).unwrap().name, "c");
    }

    #[test]
    fn test_replace_visible_drops_duplicate_ids() {
        let registry = ParcelRegistry::new();
        registry.replace_visible(vec![feature(1, "first"), feature(1, "second")]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_id(1).unwrap().name, "first");
    }

    #[test]
    fn test_upsert_replaces_existing_and_appends_new() {
        let registry = ParcelRegistry::new();
        registry.replace_visible(vec![feature(1, "a"), feature(2, "b")]);

        registry.upsert(feature(1, "renamed"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.by_id(1).unwrap().name, "renamed");

        // A just-created parcel outside the fetched viewport still lands.
        registry.upsert(feature(9, "new"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.visible().last().unwrap().id, 9);
    }

    #[test]
    fn test_update_geometry() {
        let registry = ParcelRegistry::new();
        registry.replace_visible(vec![feature(1, "a")]);

        let ring = to_ring(&[
            LngLat::new(26.20, 44.40),
            LngLat::new(26.21, 44.40),
            LngLat::new(26.21, 44.41),
        ])
        .unwrap();
        let updated = registry.update_geometry(1, ring.clone(), 2500.0).unwrap();
        assert_eq!(updated.area_m2, 2500.0);
        assert_eq!(registry.by_id(1).unwrap().ring, ring);

        assert!(registry.update_geometry(42, ring, 1.0).is_none());
    }
}
