//! Edit session: the single persisted parcel in an editable state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{watch_area, AreaWatch, SessionError};
use crate::api::ParcelWriter;
use crate::geom::{area_hectares, to_ring};
use crate::overlay::{NativePolygon, PolygonBindings};
use crate::registry::{ParcelId, ParcelRegistry};

struct ActiveEdit {
    id: ParcelId,
    /// Overlay bound at begin time, with its live-area listener. `None` when
    /// the overlay was not mounted yet; commit re-resolves through the
    /// bindings either way.
    bound: Option<(NativePolygon, AreaWatch)>,
}

/// Tracks which persisted parcel, if any, is being edited.
///
/// At most one parcel is ever in the editing state; beginning an edit for a
/// different parcel ends the prior session without persisting. Edits are
/// commit-on-demand, not commit-on-deselect.
pub struct EditSession {
    writer: Arc<dyn ParcelWriter>,
    registry: Arc<ParcelRegistry>,
    bindings: Arc<PolygonBindings>,
    active: Option<ActiveEdit>,
}

impl EditSession {
    /// Create an edit session with no active edit.
    pub fn new(
        writer: Arc<dyn ParcelWriter>,
        registry: Arc<ParcelRegistry>,
        bindings: Arc<PolygonBindings>,
    ) -> Self {
        Self {
            writer,
            registry,
            bindings,
            active: None,
        }
    }

    /// Identifier of the parcel being edited, if any.
    pub fn active_id(&self) -> Option<ParcelId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Begin editing the given parcel.
    ///
    /// Ends any prior edit first (without a patch call). If the parcel's
    /// overlay is mounted it becomes editable and its path mutations keep a
    /// live area value current.
    pub fn begin(&mut self, id: ParcelId) {
        self.end();

        let bound = self.bindings.get(id).map(|polygon| {
            polygon.set_editable(true);
            let watch = watch_area(&polygon);
            (polygon, watch)
        });
        if bound.is_none() {
            debug!(parcel = id, "edit started with no mounted overlay");
        }
        self.active = Some(ActiveEdit { id, bound });
        debug!(parcel = id, "edit session started");
    }

    /// End the active edit without persisting.
    ///
    /// Unsubscribes the path listener and returns the overlay to read-only,
    /// so no recomputation dangles on a polygon the session no longer
    /// controls. No-op when nothing is being edited.
    pub fn end(&mut self) {
        if let Some(active) = self.active.take() {
            if let Some((polygon, watch)) = active.bound {
                polygon.remove_path_listener(watch.listener);
                polygon.set_editable(false);
            }
            debug!(parcel = active.id, "edit session ended");
        }
    }

    /// Live area of the edited polygon in hectares, when an overlay is bound.
    pub fn live_area_ha(&self) -> Option<f64> {
        self.active
            .as_ref()
            .and_then(|a| a.bound.as_ref())
            .map(|(_, watch)| area_hectares(*watch.cell.lock().unwrap()))
    }

    /// Persist the edited geometry through the patch collaborator.
    ///
    /// Reads the overlay currently bound for the active identifier — failing
    /// with [`SessionError::UnboundEditTarget`] if none is bound or it has
    /// been detached (e.g. scrolled out of view) — converts it to a ring, and
    /// patches. On success the registry entry's geometry and server-reported
    /// area are updated and the new area is returned; the session stays
    /// active. On failure nothing local changes.
    pub async fn commit(&mut self) -> Result<f64, SessionError> {
        let id = self.active_id().ok_or(SessionError::NoActiveEdit)?;
        let polygon = self
            .bindings
            .get(id)
            .filter(|p| p.is_attached())
            .ok_or(SessionError::UnboundEditTarget(id))?;

        let ring = to_ring(&polygon.path())?;
        let patched = match self.writer.patch_geometry(id, &ring).await {
            Ok(patched) => patched,
            Err(e) => {
                warn!(parcel = id, error = %e, "geometry patch failed");
                return Err(e.into());
            }
        };

        if self.registry.update_geometry(id, ring, patched.area_m2).is_none() {
            // Patched on the server but scrolled out of the visible window;
            // the next viewport fetch will pick it up.
            warn!(parcel = id, "patched parcel no longer in visible set");
        }
        info!(parcel = id, area_m2 = patched.area_m2, "edit committed");
        Ok(patched.area_m2)
    }
}
