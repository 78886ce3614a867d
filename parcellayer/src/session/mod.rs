//! Draft and edit sessions
//!
//! Transient editing state layered over the overlay seam: a draft session for
//! a polygon being drawn but not yet persisted, and an edit session tracking
//! the single persisted parcel currently in an editable state. Both convert
//! geometry through [`crate::geom`] and commit through the write collaborator;
//! a failed commit always leaves local state (including the open overlay)
//! exactly as it was before the attempt.

mod draft;
mod edit;

pub use draft::{DraftSession, DraftState};
pub use edit::EditSession;

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::api::ApiError;
use crate::geom::{compute_area, to_ring, GeomError};
use crate::overlay::{ListenerId, NativePolygon};
use crate::registry::ParcelId;

/// Errors surfaced at the session boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Geometry cannot enclose an area; never sent to the server.
    #[error(transparent)]
    Geometry(#[from] GeomError),

    /// Create or patch call failed; the session is retained so the operator
    /// can retry or discard.
    #[error("commit failed: {message}")]
    CommitFailed { message: String },

    /// No draft polygon to commit or discard.
    #[error("no draft is in progress")]
    NoActiveDraft,

    /// A draft is already being drawn.
    #[error("a draft is already in progress")]
    DraftAlreadyActive,

    /// No parcel is in the editing state.
    #[error("no parcel is being edited")]
    NoActiveEdit,

    /// Commit attempted while no overlay is bound for the active identifier,
    /// e.g. it scrolled out of view.
    #[error("no overlay is bound for parcel {0}")]
    UnboundEditTarget(ParcelId),

    /// Edit requested with nothing selected.
    #[error("no parcel is selected")]
    NothingSelected,
}

impl From<ApiError> for SessionError {
    fn from(e: ApiError) -> Self {
        // Prefer the server's own message; fall back to a generic one.
        let message = e
            .server_detail()
            .map(str::to_string)
            .unwrap_or_else(|| "the server could not save the parcel".to_string());
        SessionError::CommitFailed { message }
    }
}

/// Live area cell updated synchronously on every path mutation.
pub(crate) struct AreaWatch {
    pub cell: Arc<Mutex<f64>>,
    pub listener: ListenerId,
}

/// Recompute the enclosed area of a polygon's current path.
///
/// A transiently degenerate path (mid-edit) reads as zero area.
pub(crate) fn current_area(polygon: &NativePolygon) -> f64 {
    to_ring(&polygon.path())
        .map(|ring| compute_area(&ring))
        .unwrap_or(0.0)
}

/// Attach a path listener that keeps a live area value current.
///
/// The listener recomputes synchronously in mutation order, so the cell never
/// lags the path by more than the event being handled.
pub(crate) fn watch_area(polygon: &NativePolygon) -> AreaWatch {
    let cell = Arc::new(Mutex::new(current_area(polygon)));
    let watched = polygon.clone();
    let sink = Arc::clone(&cell);
    let listener = polygon.add_path_listener(move |_| {
        *sink.lock().unwrap() = current_area(&watched);
    });
    AreaWatch { cell, listener }
}
