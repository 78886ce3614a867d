//! Mutable polygon overlay handle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::trace;

use crate::geom::LngLat;

/// A single vertex mutation on a polygon path.
///
/// Mirrors the three mutation callbacks native editing UIs raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEvent {
    /// Vertex at the index was moved.
    SetAt(usize),
    /// Vertex was inserted at the index.
    InsertAt(usize),
    /// Vertex at the index was removed.
    RemoveAt(usize),
}

/// Errors raised by overlay mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// Only the actively drawn or edited polygon may be mutated.
    #[error("polygon is not editable")]
    NotEditable,

    /// The overlay has been removed from the map.
    #[error("polygon overlay is detached")]
    Detached,

    /// Vertex index outside the current path.
    #[error("vertex index {index} out of bounds for path of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Handle identifying a registered path listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type PathListener = Arc<dyn Fn(PathEvent) + Send + Sync>;

struct PolygonInner {
    /// Open vertex path, in provider order.
    path: Mutex<Vec<LngLat>>,
    /// Registered path-mutation listeners, fired in registration order.
    listeners: Mutex<BTreeMap<u64, PathListener>>,
    next_listener: AtomicU64,
    attached: AtomicBool,
    editable: AtomicBool,
}

/// A mutable polygon overlay as rendered by the map provider.
///
/// Cloning yields another handle to the same overlay. Mutators fire the
/// registered path listeners synchronously, in registration order, after the
/// path has been updated — so a listener always observes the post-mutation
/// path before the next mutation is processed.
#[derive(Clone)]
pub struct NativePolygon {
    inner: Arc<PolygonInner>,
}

impl NativePolygon {
    /// Create an overlay with the given open vertex path.
    ///
    /// The overlay starts attached and read-only; sessions mark it editable.
    pub fn new(path: Vec<LngLat>) -> Self {
        Self {
            inner: Arc::new(PolygonInner {
                path: Mutex::new(path),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener: AtomicU64::new(0),
                attached: AtomicBool::new(true),
                editable: AtomicBool::new(false),
            }),
        }
    }

    /// Snapshot of the current open vertex path.
    pub fn path(&self) -> Vec<LngLat> {
        self.inner.path.lock().unwrap().clone()
    }

    /// Number of vertices in the path.
    pub fn len(&self) -> usize {
        self.inner.path.lock().unwrap().len()
    }

    /// Whether the path has no vertices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the overlay is still mounted on the map.
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    /// Whether the overlay accepts vertex mutation.
    pub fn is_editable(&self) -> bool {
        self.inner.editable.load(Ordering::Acquire)
    }

    /// Mark the overlay editable or read-only.
    pub fn set_editable(&self, editable: bool) {
        self.inner.editable.store(editable, Ordering::Release);
    }

    /// Move the vertex at `index` to a new position.
    pub fn set_at(&self, index: usize, point: LngLat) -> Result<(), OverlayError> {
        self.mutate(|path| {
            let len = path.len();
            let slot = path
                .get_mut(index)
                .ok_or(OverlayError::IndexOutOfBounds { index, len })?;
            *slot = point;
            Ok(PathEvent::SetAt(index))
        })
    }

    /// Insert a vertex at `index`.
    pub fn insert_at(&self, index: usize, point: LngLat) -> Result<(), OverlayError> {
        self.mutate(|path| {
            if index > path.len() {
                return Err(OverlayError::IndexOutOfBounds {
                    index,
                    len: path.len(),
                });
            }
            path.insert(index, point);
            Ok(PathEvent::InsertAt(index))
        })
    }

    /// Remove the vertex at `index`.
    pub fn remove_at(&self, index: usize) -> Result<(), OverlayError> {
        self.mutate(|path| {
            if index >= path.len() {
                return Err(OverlayError::IndexOutOfBounds {
                    index,
                    len: path.len(),
                });
            }
            path.remove(index);
            Ok(PathEvent::RemoveAt(index))
        })
    }

    /// Register a listener fired synchronously after every path mutation.
    pub fn add_path_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(PathEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .insert(id, Arc::new(listener));
        ListenerId(id)
    }

    /// Remove a previously registered listener.
    ///
    /// Returns `false` if the listener was already removed.
    pub fn remove_path_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().unwrap().remove(&id.0).is_some()
    }

    /// Remove the overlay from the map.
    ///
    /// Drops all listeners so no recomputation fires on a polygon no longer
    /// controlled by a session.
    pub fn remove_overlay(&self) {
        self.inner.attached.store(false, Ordering::Release);
        self.inner.editable.store(false, Ordering::Release);
        self.inner.listeners.lock().unwrap().clear();
        trace!("polygon overlay removed");
    }

    fn mutate<F>(&self, op: F) -> Result<(), OverlayError>
    where
        F: FnOnce(&mut Vec<LngLat>) -> Result<PathEvent, OverlayError>,
    {
        if !self.is_attached() {
            return Err(OverlayError::Detached);
        }
        if !self.is_editable() {
            return Err(OverlayError::NotEditable);
        }

        let event = {
            let mut path = self.inner.path.lock().unwrap();
            op(&mut path)?
        };
        self.fire(event);
        Ok(())
    }

    /// Fire listeners outside the path lock so they can read the new path.
    fn fire(&self, event: PathEvent) {
        let listeners: Vec<PathListener> = {
            let guard = self.inner.listeners.lock().unwrap();
            guard.values().cloned().collect()
        };
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for NativePolygon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativePolygon")
            .field("vertices", &self.len())
            .field("attached", &self.is_attached())
            .field("editable", &self.is_editable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn triangle() -> NativePolygon {
        NativePolygon::new(vec![
            LngLat::new(26.10, 44.30),
            LngLat::new(26.11, 44.30),
            LngLat::new(26.11, 44.31),
        ])
    }

    #[test]
    fn test_read_only_polygon_rejects_mutation() {
        let poly = triangle();
        assert_eq!(
            poly.set_at(0, LngLat::new(26.0, 44.0)),
            Err(OverlayError::NotEditable)
        );
    }

    #[test]
    fn test_mutations_update_path_and_fire_in_order() {
        let poly = triangle();
        poly.set_editable(true);

        let events = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        poly.add_path_listener(move |event| sink.lock().unwrap().push(event));

        poly.insert_at(3, LngLat::new(26.10, 44.31)).unwrap();
        poly.set_at(0, LngLat::new(26.09, 44.30)).unwrap();
        poly.remove_at(3).unwrap();

        assert_eq!(poly.len(), 3);
        assert_eq!(poly.path()[0], LngLat::new(26.09, 44.30));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                PathEvent::InsertAt(3),
                PathEvent::SetAt(0),
                PathEvent::RemoveAt(3)
            ]
        );
    }

    #[test]
    fn test_removed_listener_does_not_fire() {
        let poly = triangle();
        poly.set_editable(true);

        let count = Arc::new(StdMutex::new(0usize));
        let sink = Arc::clone(&count);
        let id = poly.add_path_listener(move |_| *sink.lock().unwrap() += 1);

        poly.set_at(0, LngLat::new(26.0, 44.0)).unwrap();
        assert!(poly.remove_path_listener(id));
        poly.set_at(0, LngLat::new(26.1, 44.1)).unwrap();

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(!poly.remove_path_listener(id), "second removal is a no-op");
    }

    #[test]
    fn test_out_of_bounds_index() {
        let poly = triangle();
        poly.set_editable(true);
        assert_eq!(
            poly.remove_at(9),
            Err(OverlayError::IndexOutOfBounds { index: 9, len: 3 })
        );
    }

    #[test]
    fn test_remove_overlay_detaches_and_drops_listeners() {
        let poly = triangle();
        poly.set_editable(true);

        let count = Arc::new(StdMutex::new(0usize));
        let sink = Arc::clone(&count);
        poly.add_path_listener(move |_| *sink.lock().unwrap() += 1);

        poly.remove_overlay();
        assert!(!poly.is_attached());
        assert_eq!(
            poly.set_at(0, LngLat::new(26.0, 44.0)),
            Err(OverlayError::Detached)
        );
        assert_eq!(*count.lock().unwrap(), 0);
    }
}
