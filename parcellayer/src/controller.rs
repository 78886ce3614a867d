//! Map view controller.
//!
//! Single owner of the state the map provider's callback model would
//! otherwise scatter across globals: the map surface handle, the debounced
//! fetch scheduler, the parcel registry, the id-to-overlay bindings, and the
//! draft/edit sessions. The embedding view constructs it with
//! [`MapController::attach`], routes provider callbacks into the `on_*` entry
//! points, and tears everything down with [`MapController::detach`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::api::{ParcelReader, ParcelWriter};
use crate::fetch::{FetchConfig, FetchNotice, FetchScheduler};
use crate::geom::LngLat;
use crate::overlay::{NativePolygon, PolygonBindings};
use crate::registry::{ParcelFeature, ParcelId, ParcelRegistry};
use crate::session::{DraftSession, DraftState, EditSession, SessionError};
use crate::viewport::{MapSurface, TrackerConfig, Viewport, ViewportTracker};

/// Selection state of the mapping view.
///
/// Exactly one of: nothing selected, a parcel selected read-only, or a parcel
/// selected and editing. Only the editing parcel's overlay is mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    None,
    Selected(ParcelId),
    Editing(ParcelId),
}

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub tracker: TrackerConfig,
    pub fetch: FetchConfig,
    /// Zoom clamp applied to the fit-to-selection viewport suggestion.
    pub fit_zoom_min: u8,
    pub fit_zoom_max: u8,
    /// Zoom used for locate-me suggestions and as the fit fallback before
    /// the map has rendered.
    pub locate_zoom: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            fetch: FetchConfig::default(),
            fit_zoom_min: 17,
            fit_zoom_max: 19,
            locate_zoom: 18,
        }
    }
}

/// Owns the viewport-synchronization and parcel-editing state machine for one
/// mapping view.
pub struct MapController {
    surface: Arc<dyn MapSurface>,
    tracker: Arc<ViewportTracker>,
    scheduler: Arc<FetchScheduler>,
    registry: Arc<ParcelRegistry>,
    bindings: Arc<PolygonBindings>,
    draft: DraftSession,
    edit: EditSession,
    selection: Selection,
    config: ControllerConfig,
}

impl MapController {
    /// Build a controller over the host map surface and the parcel
    /// collaborators.
    pub fn attach(
        surface: Arc<dyn MapSurface>,
        reader: Arc<dyn ParcelReader>,
        writer: Arc<dyn ParcelWriter>,
        config: ControllerConfig,
    ) -> Self {
        let registry = Arc::new(ParcelRegistry::new());
        let bindings = Arc::new(PolygonBindings::new());
        let tracker = Arc::new(ViewportTracker::new(
            Arc::clone(&surface),
            config.tracker.clone(),
        ));
        let scheduler = Arc::new(FetchScheduler::new(
            Arc::clone(&tracker),
            reader,
            Arc::clone(&registry),
            config.fetch.clone(),
        ));
        let draft = DraftSession::new(Arc::clone(&writer), Arc::clone(&registry));
        let edit = EditSession::new(writer, Arc::clone(&registry), Arc::clone(&bindings));
        info!("map controller attached");
        Self {
            surface,
            tracker,
            scheduler,
            registry,
            bindings,
            draft,
            edit,
            selection: Selection::None,
            config,
        }
    }

    /// Tear the controller down: stop the scheduler, discard any draft, end
    /// any edit, and drop overlay bindings.
    pub fn detach(mut self) {
        self.scheduler.shutdown();
        self.draft.discard();
        self.edit.end();
        self.bindings.clear();
        info!("map controller detached");
    }

    /// The parcel registry (visible-set cache).
    pub fn registry(&self) -> Arc<ParcelRegistry> {
        Arc::clone(&self.registry)
    }

    /// The viewport tracker.
    pub fn tracker(&self) -> Arc<ViewportTracker> {
        Arc::clone(&self.tracker)
    }

    /// The fetch scheduler.
    pub fn scheduler(&self) -> Arc<FetchScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Subscribe to fetch outcome notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<FetchNotice> {
        self.scheduler.subscribe_notices()
    }

    // === Provider callbacks ===

    /// The map became idle after a pan, zoom, or load.
    pub fn on_map_idle(&self) {
        if self.tracker.notify_idle().is_some() {
            self.scheduler.notify_viewport_changed();
        }
    }

    /// A parcel's overlay was mounted on the map.
    pub fn on_overlay_mounted(&self, id: ParcelId, polygon: NativePolygon) {
        self.bindings.mount(id, polygon);
    }

    /// A parcel's overlay was unmounted (e.g. scrolled out of view).
    pub fn on_overlay_unmounted(&self, id: ParcelId) {
        self.bindings.unmount(id);
    }

    // === Draft flow ===

    /// Enter polygon drawing mode.
    pub fn begin_drawing(&mut self) -> Result<(), SessionError> {
        self.draft.begin_drawing()
    }

    /// The drawing tool finished and handed back the drawn polygon.
    pub fn on_polygon_complete(&mut self, polygon: NativePolygon) -> Result<(), SessionError> {
        self.draft.polygon_complete(polygon)
    }

    /// Current draft state.
    pub fn draft_state(&self) -> DraftState {
        self.draft.state()
    }

    /// Live draft area in square meters.
    pub fn draft_area_m2(&self) -> f64 {
        self.draft.live_area_m2()
    }

    /// Live draft area in hectares.
    pub fn draft_area_ha(&self) -> f64 {
        self.draft.live_area_ha()
    }

    /// Persist the draft. See [`DraftSession::commit`].
    pub async fn commit_draft(
        &mut self,
        name: &str,
        reference: &str,
    ) -> Result<ParcelFeature, SessionError> {
        self.draft.commit(name, reference).await
    }

    /// Discard the draft without persisting.
    pub fn discard_draft(&mut self) {
        self.draft.discard();
    }

    // === Selection and edit flow ===

    /// Current selection state.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Select a parcel (or clear the selection with `None`).
    ///
    /// Selecting a different parcel while one is mid-edit ends that edit
    /// without issuing a patch. Returns a fit-to-feature viewport suggestion
    /// (ring bounding box, zoom clamped to the configured range) for the host
    /// to apply; presentation policy, not a correctness requirement.
    pub fn select(&mut self, id: Option<ParcelId>) -> Option<Viewport> {
        if let Selection::Editing(current) = self.selection {
            if id == Some(current) {
                // Re-selecting the parcel being edited keeps the edit alive.
                return self.fit_viewport(current);
            }
            debug!(parcel = current, "selection change ends edit without patch");
            self.edit.end();
        }

        match id {
            Some(id) => {
                self.selection = Selection::Selected(id);
                self.fit_viewport(id)
            }
            None => {
                self.selection = Selection::None;
                None
            }
        }
    }

    /// Put the selected parcel into the editing state.
    pub fn begin_edit(&mut self) -> Result<(), SessionError> {
        let id = match self.selection {
            Selection::None => return Err(SessionError::NothingSelected),
            Selection::Selected(id) | Selection::Editing(id) => id,
        };
        self.edit.begin(id);
        self.selection = Selection::Editing(id);
        Ok(())
    }

    /// Commit the active edit. See [`EditSession::commit`].
    pub async fn commit_edit(&mut self) -> Result<f64, SessionError> {
        self.edit.commit().await
    }

    /// End the active edit without persisting; the parcel stays selected.
    pub fn end_edit(&mut self) {
        self.edit.end();
        if let Selection::Editing(id) = self.selection {
            self.selection = Selection::Selected(id);
        }
    }

    /// Live area of the edited polygon in hectares, when bound.
    pub fn edit_area_ha(&self) -> Option<f64> {
        self.edit.live_area_ha()
    }

    // === Viewport suggestions ===

    /// Centered viewport suggestion for a locate-me action.
    pub fn locate(&self, lng: f64, lat: f64) -> Viewport {
        let center = LngLat::new(lng, lat);
        Viewport {
            south_west: center,
            north_east: center,
            zoom: self.config.locate_zoom,
        }
    }

    /// Fit-to-feature viewport for a parcel in the registry.
    fn fit_viewport(&self, id: ParcelId) -> Option<Viewport> {
        let feature = self.registry.by_id(id)?;
        let bbox = feature.ring.bounding_box();
        let zoom = self
            .surface
            .current_viewport()
            .map(|v| v.zoom)
            .unwrap_or(self.config.locate_zoom)
            .clamp(self.config.fit_zoom_min, self.config.fit_zoom_max);
        Some(Viewport {
            south_west: LngLat::new(bbox.west, bbox.south),
            north_east: LngLat::new(bbox.east, bbox.north),
            zoom,
        })
    }
}
