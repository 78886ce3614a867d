//! Draft session: a polygon being drawn but not yet persisted.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{watch_area, AreaWatch, SessionError};
use crate::api::{CreateParcelRequest, ParcelWriter, WireGeometry};
use crate::geom::{area_hectares, to_ring};
use crate::overlay::NativePolygon;
use crate::registry::{ParcelFeature, ParcelRegistry, UNKNOWN_REFERENCE};

/// Draft session states.
///
/// `Drawing` covers the interval between the operator starting the drawing
/// tool and the provider handing back a completed polygon; from there the
/// draft is immediately editable pending a name and reference
/// (`PendingCommit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Idle,
    Drawing,
    PendingCommit,
}

/// Transient state for an unpersisted parcel polygon.
pub struct DraftSession {
    writer: Arc<dyn ParcelWriter>,
    registry: Arc<ParcelRegistry>,
    state: DraftState,
    polygon: Option<NativePolygon>,
    watch: Option<AreaWatch>,
}

impl DraftSession {
    /// Create an idle draft session.
    pub fn new(writer: Arc<dyn ParcelWriter>, registry: Arc<ParcelRegistry>) -> Self {
        Self {
            writer,
            registry,
            state: DraftState::Idle,
            polygon: None,
            watch: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> DraftState {
        self.state
    }

    /// The draft overlay, while one exists.
    pub fn polygon(&self) -> Option<&NativePolygon> {
        self.polygon.as_ref()
    }

    /// Enter drawing mode.
    ///
    /// Errors if a draft is already in progress; the caller decides whether
    /// to discard first.
    pub fn begin_drawing(&mut self) -> Result<(), SessionError> {
        if self.state != DraftState::Idle {
            return Err(SessionError::DraftAlreadyActive);
        }
        self.state = DraftState::Drawing;
        debug!("draft drawing started");
        Ok(())
    }

    /// The provider finished placing vertices and handed back the polygon.
    ///
    /// Marks the polygon editable and subscribes to its path mutations so
    /// every vertex add/move/remove recomputes the live area before the next
    /// event is handled.
    pub fn polygon_complete(&mut self, polygon: NativePolygon) -> Result<(), SessionError> {
        if self.state != DraftState::Drawing {
            return Err(SessionError::NoActiveDraft);
        }
        polygon.set_editable(true);
        self.watch = Some(watch_area(&polygon));
        self.polygon = Some(polygon);
        self.state = DraftState::PendingCommit;
        debug!("draft polygon complete, pending commit");
        Ok(())
    }

    /// Live area of the draft in square meters.
    pub fn live_area_m2(&self) -> f64 {
        self.watch
            .as_ref()
            .map(|w| *w.cell.lock().unwrap())
            .unwrap_or(0.0)
    }

    /// Live area of the draft in hectares.
    pub fn live_area_ha(&self) -> f64 {
        area_hectares(self.live_area_m2())
    }

    /// Persist the draft through the creation collaborator.
    ///
    /// An empty `name` is replaced with a timestamp-based placeholder and an
    /// empty `reference` with the unknown-reference sentinel. On success the
    /// overlay is removed, the created parcel (server identifier and area) is
    /// upserted into the registry, and the session returns to idle. On
    /// failure the session stays in `PendingCommit` with the overlay retained
    /// so the operator can retry or discard.
    pub async fn commit(
        &mut self,
        name: &str,
        reference: &str,
    ) -> Result<ParcelFeature, SessionError> {
        if self.state != DraftState::PendingCommit {
            return Err(SessionError::NoActiveDraft);
        }
        let polygon = self.polygon.clone().ok_or(SessionError::NoActiveDraft)?;

        // Degenerate geometry is rejected locally, never sent to the server.
        let ring = to_ring(&polygon.path())?;

        let name = if name.trim().is_empty() {
            format!("Parcel {}", Utc::now().timestamp_millis())
        } else {
            name.to_string()
        };
        let reference = if reference.trim().is_empty() {
            UNKNOWN_REFERENCE.to_string()
        } else {
            reference.to_string()
        };

        let request = CreateParcelRequest {
            name: name.clone(),
            cf_number: reference.clone(),
            geom_geojson: WireGeometry::from_ring(&ring),
        };
        let created = match self.writer.create_parcel(request).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "draft commit failed, overlay retained");
                return Err(e.into());
            }
        };

        let feature = ParcelFeature {
            id: created.id,
            name,
            cf_reference: Some(reference),
            area_m2: created.area_m2,
            ring,
        };
        self.registry.upsert(feature.clone());
        self.teardown();
        info!(parcel = created.id, area_m2 = created.area_m2, "draft committed");
        Ok(feature)
    }

    /// Drop the draft without calling the server.
    ///
    /// Valid from any state; removing an overlay that was never created is a
    /// no-op.
    pub fn discard(&mut self) {
        if self.state != DraftState::Idle {
            debug!("draft discarded");
        }
        self.teardown();
    }

    /// Remove the listener and overlay, and return to idle.
    fn teardown(&mut self) {
        if let (Some(polygon), Some(watch)) = (&self.polygon, self.watch.take()) {
            polygon.remove_path_listener(watch.listener);
        }
        if let Some(polygon) = self.polygon.take() {
            polygon.remove_overlay();
        }
        self.state = DraftState::Idle;
    }
}
