//! Debounced viewport fetch scheduler.
//!
//! Viewport-change notifications arrive in bursts while the operator pans and
//! zooms. The scheduler coalesces each burst with a trailing-edge debounce:
//! every notification cancels-and-replaces the pending timer, and only the
//! timer that survives the quiescence window issues a fetch. A single
//! in-flight permit guarantees requests never overlap; responses are applied
//! in completion order, and a completed response for a superseded viewport is
//! still applied since a full replace is corrected by the next cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::ParcelReader;
use crate::geom::BoundingBox;
use crate::registry::ParcelRegistry;
use crate::viewport::ViewportTracker;

/// Fetch scheduler configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Quiescence window measured from the most recent notification.
    pub quiescence: Duration,
    /// Channel capacity for fetch notices.
    pub notice_channel_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_millis(400),
            notice_channel_capacity: 16,
        }
    }
}

/// One scheduled or in-flight bounding-box query.
///
/// `seq` increases monotonically per issued request. It tags log lines and
/// notices for diagnostics only: stale-but-complete responses are still
/// applied, by policy, rather than dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub bbox: BoundingBox,
    pub zoom: u8,
    pub seq: u64,
}

/// Outcome notices broadcast to the embedding view.
#[derive(Debug, Clone)]
pub enum FetchNotice {
    /// A response was applied; the visible set was replaced.
    Applied { request: FetchRequest, count: usize },
    /// The fetch failed; the previous visible set was kept. Surfaced once per
    /// failure, never retried automatically.
    ViewportDataUnavailable { request: FetchRequest, message: String },
}

/// Fetch scheduler statistics for monitoring.
#[derive(Debug, Default)]
pub struct FetchStats {
    /// Notifications received.
    pub notifications: AtomicU64,
    /// Timers that fired after surviving the quiescence window.
    pub timers_fired: AtomicU64,
    /// Responses applied to the registry.
    pub applied: AtomicU64,
    /// Failed fetches.
    pub failed: AtomicU64,
}

impl FetchStats {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            notifications: self.notifications.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of fetch scheduler statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStatsSnapshot {
    pub notifications: u64,
    pub timers_fired: u64,
    pub applied: u64,
    pub failed: u64,
}

/// State shared with the spawned timer tasks.
struct FetchInner {
    tracker: Arc<ViewportTracker>,
    reader: Arc<dyn ParcelReader>,
    registry: Arc<ParcelRegistry>,
    /// Serializes issued requests; at most one fetch is in flight.
    in_flight: tokio::sync::Mutex<()>,
    /// Sequence tag for issued requests.
    seq: AtomicU64,
    notice_tx: broadcast::Sender<FetchNotice>,
    stats: Arc<FetchStats>,
    /// Parent token; cancelled on shutdown, which also cancels any pending
    /// timer derived from it.
    shutdown: CancellationToken,
}

impl FetchInner {
    /// Timer body: read the viewport, issue the query, apply the result.
    async fn fire(&self) {
        // Serialize with any request already in flight.
        let _permit = self.in_flight.lock().await;
        if self.shutdown.is_cancelled() {
            return;
        }
        self.stats.timers_fired.fetch_add(1, Ordering::Relaxed);

        let Some(viewport) = self.tracker.current_viewport() else {
            trace!("debounce fired before first render, skipping fetch");
            return;
        };
        let request = FetchRequest {
            bbox: viewport.bounding_box(),
            zoom: viewport.zoom,
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
        };
        debug!(seq = request.seq, zoom = request.zoom, "issuing viewport fetch");

        match self.reader.parcels_in_bbox(request.bbox, request.zoom).await {
            Ok(features) => {
                let count = features.len();
                self.registry.replace_visible(features);
                self.stats.applied.fetch_add(1, Ordering::Relaxed);
                debug!(seq = request.seq, count, "viewport fetch applied");
                let _ = self.notice_tx.send(FetchNotice::Applied { request, count });
            }
            Err(e) => {
                // Stale-but-present beats empty: the registry is untouched.
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(seq = request.seq, error = %e, "viewport fetch failed, keeping previous visible set");
                let _ = self.notice_tx.send(FetchNotice::ViewportDataUnavailable {
                    request,
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Debounces viewport changes into bounding-box queries.
pub struct FetchScheduler {
    inner: Arc<FetchInner>,
    config: FetchConfig,
    /// Cancellation token of the pending (not-yet-fired) debounce timer.
    pending: Mutex<Option<CancellationToken>>,
}

impl FetchScheduler {
    /// Create a scheduler over the given tracker, read collaborator, and
    /// registry.
    pub fn new(
        tracker: Arc<ViewportTracker>,
        reader: Arc<dyn ParcelReader>,
        registry: Arc<ParcelRegistry>,
        config: FetchConfig,
    ) -> Self {
        let (notice_tx, _) = broadcast::channel(config.notice_channel_capacity);
        Self {
            inner: Arc::new(FetchInner {
                tracker,
                reader,
                registry,
                in_flight: tokio::sync::Mutex::new(()),
                seq: AtomicU64::new(0),
                notice_tx,
                stats: Arc::new(FetchStats::default()),
                shutdown: CancellationToken::new(),
            }),
            config,
            pending: Mutex::new(None),
        }
    }

    /// Subscribe to fetch outcome notices.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<FetchNotice> {
        self.inner.notice_tx.subscribe()
    }

    /// Access the statistics for monitoring.
    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Record a viewport change and (re)start the debounce timer.
    ///
    /// Cancels any previously scheduled timer that has not fired yet, so a
    /// burst of notifications yields exactly one fetch once the viewport has
    /// been quiet for the configured window.
    pub fn notify_viewport_changed(&self) {
        self.inner.stats.notifications.fetch_add(1, Ordering::Relaxed);

        let token = self.inner.shutdown.child_token();
        {
            let mut pending = self.pending.lock().unwrap();
            if let Some(previous) = pending.replace(token.clone()) {
                trace!("superseding pending fetch timer");
                previous.cancel();
            }
        }

        let inner = Arc::clone(&self.inner);
        let quiescence = self.config.quiescence;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(quiescence) => {}
            }
            inner.fire().await;
        });
    }

    /// Cancel the pending timer and prevent future fires.
    ///
    /// An already in-flight request is allowed to complete.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(token) = self.pending.lock().unwrap().take() {
            token.cancel();
        }
    }
}
