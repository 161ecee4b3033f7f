//! Slow-network overlay for uploads.
//!
//! The backend request races two timers: one that raises the overlay after
//! `show_after`, and one that lowers it again `hide_after` later. Whichever
//! branch loses a `select!` is dropped, so no timer outlives the request.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct OverlayTimings {
    pub show_after: Duration,
    pub hide_after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    Submitting,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub filename: String,
    pub phase: UploadPhase,
    pub overlay_visible: bool,
}

/// Shared view of one in-flight upload, written by the request task and
/// read by the status page.
#[derive(Debug, Clone)]
pub struct UploadTracker {
    inner: Arc<Mutex<UploadProgress>>,
}

impl UploadTracker {
    pub fn new(filename: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UploadProgress {
                filename: filename.to_string(),
                phase: UploadPhase::Submitting,
                overlay_visible: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadProgress> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> UploadProgress {
        self.lock().clone()
    }

    pub fn set_overlay(&self, visible: bool) {
        self.lock().overlay_visible = visible;
    }

    /// Settles the upload and always lowers the overlay.
    pub fn finish(&self, phase: UploadPhase) {
        let mut progress = self.lock();
        progress.phase = phase;
        progress.overlay_visible = false;
    }
}

/// Drives `request` to completion while toggling the overlay through
/// `on_overlay`. The overlay is never left raised once this returns.
pub async fn race_overlay<F, T>(request: F, timings: OverlayTimings, on_overlay: impl Fn(bool)) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(request);

    tokio::select! {
        out = &mut request => return out,
        _ = tokio::time::sleep(timings.show_after) => on_overlay(true),
    }

    tokio::select! {
        out = &mut request => {
            on_overlay(false);
            return out;
        }
        _ = tokio::time::sleep(timings.hide_after) => on_overlay(false),
    }

    request.await
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMINGS: OverlayTimings = OverlayTimings {
        show_after: Duration::from_secs(7),
        hide_after: Duration::from_secs(5),
    };

    async fn run_for(request_time: Duration) -> Vec<bool> {
        let events = Mutex::new(Vec::new());
        let out = race_overlay(
            async {
                tokio::time::sleep(request_time).await;
                42
            },
            TIMINGS,
            |visible| events.lock().unwrap().push(visible),
        )
        .await;
        assert_eq!(out, 42);
        events.into_inner().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn fast_request_never_shows_overlay() {
        assert!(run_for(Duration::from_secs(2)).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn request_settling_while_shown_hides_overlay() {
        assert_eq!(run_for(Duration::from_secs(9)).await, vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_auto_hides_before_very_slow_request_ends() {
        let start = tokio::time::Instant::now();
        assert_eq!(run_for(Duration::from_secs(30)).await, vec![true, false]);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[test]
    fn finish_lowers_overlay() {
        let tracker = UploadTracker::new("a.json");
        tracker.set_overlay(true);
        tracker.finish(UploadPhase::Failed("bad".into()));
        let progress = tracker.snapshot();
        assert!(!progress.overlay_visible);
        assert_eq!(progress.phase, UploadPhase::Failed("bad".into()));
        assert_eq!(progress.filename, "a.json");
    }
}
