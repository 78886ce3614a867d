//! Integration tests for the debounced viewport fetch path.
//!
//! These tests verify the scheduler contract end to end:
//! - trailing-edge debounce (a burst of notifications yields one fetch)
//! - spaced notifications each yield their own fetch
//! - a failed fetch keeps the previous visible set and surfaces exactly one
//!   unavailable notice
//!
//! Run with: `cargo test --test fetch_integration`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parcellayer::api::{ApiError, BoxFuture, ParcelReader};
use parcellayer::fetch::{FetchConfig, FetchNotice, FetchScheduler};
use parcellayer::geom::{to_ring, BoundingBox, LngLat};
use parcellayer::registry::{ParcelFeature, ParcelId, ParcelRegistry};
use parcellayer::viewport::{MapSurface, TrackerConfig, Viewport, ViewportTracker};

// ============================================================================
// Mock Implementations
// ============================================================================

/// Mock map surface with a settable viewport.
struct MockSurface {
    viewport: Mutex<Option<Viewport>>,
}

impl MockSurface {
    fn rendered() -> Arc<Self> {
        Arc::new(Self {
            viewport: Mutex::new(Some(Viewport {
                south_west: LngLat::new(26.0, 44.2),
                north_east: LngLat::new(26.2, 44.4),
                zoom: 15,
            })),
        })
    }

    fn unrendered() -> Arc<Self> {
        Arc::new(Self {
            viewport: Mutex::new(None),
        })
    }
}

impl MapSurface for MockSurface {
    fn current_viewport(&self) -> Option<Viewport> {
        *self.viewport.lock().unwrap()
    }
}

/// Mock read collaborator counting calls and optionally failing.
struct MockReader {
    calls: AtomicUsize,
    fail: AtomicBool,
    response: Vec<ParcelFeature>,
}

impl MockReader {
    fn returning(response: Vec<ParcelFeature>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            response,
        })
    }

    fn failing() -> Arc<Self> {
        let reader = Self::returning(Vec::new());
        reader.fail.store(true, Ordering::SeqCst);
        reader
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ParcelReader for MockReader {
    fn parcels_in_bbox(
        &self,
        _bbox: BoundingBox,
        _zoom: u8,
    ) -> BoxFuture<'_, Result<Vec<ParcelFeature>, ApiError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail.load(Ordering::SeqCst);
        let response = self.response.clone();
        Box::pin(async move {
            if fail {
                Err(ApiError::Transport("connection refused".to_string()))
            } else {
                Ok(response)
            }
        })
    }
}

fn feature(id: ParcelId) -> ParcelFeature {
    let ring = to_ring(&[
        LngLat::new(26.10, 44.30),
        LngLat::new(26.11, 44.30),
        LngLat::new(26.11, 44.31),
    ])
    .unwrap();
    ParcelFeature {
        id,
        name: format!("Parcela {id}"),
        cf_reference: None,
        area_m2: 1000.0,
        ring,
    }
}

fn scheduler_with(
    surface: Arc<MockSurface>,
    reader: Arc<MockReader>,
) -> (Arc<FetchScheduler>, Arc<ParcelRegistry>) {
    let registry = Arc::new(ParcelRegistry::new());
    let tracker = Arc::new(ViewportTracker::new(surface, TrackerConfig::default()));
    let scheduler = Arc::new(FetchScheduler::new(
        tracker,
        reader,
        Arc::clone(&registry),
        FetchConfig::default(),
    ));
    (scheduler, registry)
}

/// Let spawned scheduler tasks run to completion on the paused runtime.
async fn drain_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn burst_of_notifications_yields_one_fetch() {
    let reader = MockReader::returning(vec![feature(1)]);
    let (scheduler, registry) = scheduler_with(MockSurface::rendered(), Arc::clone(&reader));
    let mut notices = scheduler.subscribe_notices();

    // Three notifications, each 100ms apart — all inside the 400ms window.
    scheduler.notify_viewport_changed();
    tokio::time::advance(Duration::from_millis(100)).await;
    scheduler.notify_viewport_changed();
    tokio::time::advance(Duration::from_millis(100)).await;
    scheduler.notify_viewport_changed();

    let notice = notices.recv().await.unwrap();
    drain_tasks().await;

    assert!(matches!(notice, FetchNotice::Applied { count: 1, .. }));
    assert_eq!(reader.calls(), 1, "burst must coalesce into one fetch");
    assert_eq!(registry.len(), 1);

    let stats = scheduler.stats().snapshot();
    assert_eq!(stats.notifications, 3);
    assert_eq!(stats.timers_fired, 1);
    assert_eq!(stats.applied, 1);
}

#[tokio::test(start_paused = true)]
async fn spaced_notifications_each_fetch() {
    let reader = MockReader::returning(vec![feature(1)]);
    let (scheduler, _registry) = scheduler_with(MockSurface::rendered(), Arc::clone(&reader));
    let mut notices = scheduler.subscribe_notices();

    for _ in 0..3 {
        scheduler.notify_viewport_changed();
        // Wait for this cycle's fetch to complete before the next
        // notification, so each quiescence window elapses in full.
        notices.recv().await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
    }
    drain_tasks().await;

    assert_eq!(reader.calls(), 3, "spaced notifications must each fetch");
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_preserves_visible_set_and_surfaces_one_notice() {
    let reader = MockReader::failing();
    let (scheduler, registry) = scheduler_with(MockSurface::rendered(), Arc::clone(&reader));

    // Registry already holds 5 features from an earlier successful fetch.
    registry.replace_visible((1..=5).map(feature).collect());
    let mut notices = scheduler.subscribe_notices();

    scheduler.notify_viewport_changed();
    let notice = notices.recv().await.unwrap();
    drain_tasks().await;

    assert!(matches!(notice, FetchNotice::ViewportDataUnavailable { .. }));
    assert_eq!(registry.len(), 5, "stale-but-present beats empty");
    assert!(
        notices.try_recv().is_err(),
        "the failure is surfaced exactly once"
    );
    assert_eq!(scheduler.stats().snapshot().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn fire_before_first_render_is_noop() {
    let reader = MockReader::returning(vec![feature(1)]);
    let (scheduler, registry) = scheduler_with(MockSurface::unrendered(), Arc::clone(&reader));

    scheduler.notify_viewport_changed();
    tokio::time::advance(Duration::from_millis(500)).await;
    drain_tasks().await;

    assert_eq!(reader.calls(), 0, "no viewport, no fetch");
    assert_eq!(registry.len(), 0);
    assert_eq!(scheduler.stats().snapshot().timers_fired, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_timer() {
    let reader = MockReader::returning(vec![feature(1)]);
    let (scheduler, _registry) = scheduler_with(MockSurface::rendered(), Arc::clone(&reader));

    scheduler.notify_viewport_changed();
    scheduler.shutdown();
    tokio::time::advance(Duration::from_millis(500)).await;
    drain_tasks().await;

    assert_eq!(reader.calls(), 0, "shutdown must cancel the pending fetch");
}
