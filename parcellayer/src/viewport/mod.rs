//! Viewport tracking module
//!
//! Reads the host map surface's current bounds and zoom, and raises an event
//! every time the map becomes idle after a pan, zoom, or initial load. The
//! tracker itself never fetches; it is a pure state reader plus notifier.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::geom::{BoundingBox, LngLat};

/// Snapshot of the currently visible map region.
///
/// Derived each time the map idles; never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// South-west corner.
    pub south_west: LngLat,
    /// North-east corner.
    pub north_east: LngLat,
    /// Integer zoom level.
    pub zoom: u8,
}

impl Viewport {
    /// The bounding box covering this viewport.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            west: self.south_west.lng,
            south: self.south_west.lat,
            east: self.north_east.lng,
            north: self.north_east.lat,
        }
    }
}

/// Host map handle abstraction.
///
/// Implemented by the embedding mapping view over its map provider instance.
/// `current_viewport` returns `None` until the map has rendered at least once.
pub trait MapSurface: Send + Sync {
    /// Current bounds and zoom, or `None` before the first render.
    ///
    /// Reading must have no side effects.
    fn current_viewport(&self) -> Option<Viewport>;
}

/// Configuration for the viewport tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Channel capacity for idle-event broadcasts.
    pub idle_channel_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_channel_capacity: 16,
        }
    }
}

/// Tracks the map viewport, offering both a query API (pull) and an idle
/// event subscription (push).
pub struct ViewportTracker {
    surface: Arc<dyn MapSurface>,
    idle_tx: broadcast::Sender<Viewport>,
}

impl ViewportTracker {
    /// Create a tracker over the given map surface.
    pub fn new(surface: Arc<dyn MapSurface>, config: TrackerConfig) -> Self {
        let (idle_tx, _) = broadcast::channel(config.idle_channel_capacity);
        Self { surface, idle_tx }
    }

    /// Current viewport snapshot, or `None` before the map has rendered.
    pub fn current_viewport(&self) -> Option<Viewport> {
        self.surface.current_viewport()
    }

    /// Subscribe to map-idle events.
    ///
    /// One event is broadcast per [`notify_idle`](Self::notify_idle) call that
    /// observes a rendered viewport.
    pub fn subscribe_idle(&self) -> broadcast::Receiver<Viewport> {
        self.idle_tx.subscribe()
    }

    /// Record that the map became idle after a pan, zoom, or load.
    ///
    /// Reads the current viewport and broadcasts it to subscribers. Returns
    /// the snapshot, or `None` (and no event) if the map has not rendered yet.
    pub fn notify_idle(&self) -> Option<Viewport> {
        let viewport = self.surface.current_viewport()?;
        trace!(
            zoom = viewport.zoom,
            west = viewport.south_west.lng,
            south = viewport.south_west.lat,
            "map idle"
        );
        // Send fails only when no subscriber is listening, which is fine.
        let _ = self.idle_tx.send(viewport);
        Some(viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSurface {
        viewport: Mutex<Option<Viewport>>,
    }

    impl MapSurface for FakeSurface {
        fn current_viewport(&self) -> Option<Viewport> {
            *self.viewport.lock().unwrap()
        }
    }

    fn viewport() -> Viewport {
        Viewport {
            south_west: LngLat::new(26.0, 44.2),
            north_east: LngLat::new(26.2, 44.4),
            zoom: 15,
        }
    }

    #[test]
    fn test_notify_idle_before_render_is_noop() {
        let surface = Arc::new(FakeSurface {
            viewport: Mutex::new(None),
        });
        let tracker = ViewportTracker::new(surface, TrackerConfig::default());
        let mut rx = tracker.subscribe_idle();

        assert!(tracker.notify_idle().is_none());
        assert!(rx.try_recv().is_err(), "no event before first render");
    }

    #[test]
    fn test_notify_idle_broadcasts_snapshot() {
        let surface = Arc::new(FakeSurface {
            viewport: Mutex::new(Some(viewport())),
        });
        let tracker = ViewportTracker::new(surface, TrackerConfig::default());
        let mut rx = tracker.subscribe_idle();

        let snapshot = tracker.notify_idle().unwrap();
        assert_eq!(snapshot, viewport());
        assert_eq!(rx.try_recv().unwrap(), viewport());
    }

    #[test]
    fn test_viewport_bounding_box() {
        let bbox = viewport().bounding_box();
        assert_eq!(bbox.west, 26.0);
        assert_eq!(bbox.south, 44.2);
        assert_eq!(bbox.east, 26.2);
        assert_eq!(bbox.north, 44.4);
    }
}
