//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring extraction and
//! archive progress, [`CancellationToken`] for cooperative cancellation
//! between frames, and [`ProgressInfo`] for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unanimate::{
//!     ExtractionConfig, ExtractionPipeline, ProgressCallback, ProgressInfo, UnanimateError,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} done", info.operation, info.current);
//!     }
//! }
//!
//! let config = ExtractionConfig::new().with_progress(Arc::new(PrintProgress));
//! let pipeline = ExtractionPipeline::new(config);
//! pipeline.run("input.gif", "frames", None)?;
//! # Ok::<(), UnanimateError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding frames and writing them to the output directory.
    FrameExtraction,
    /// Packing an output directory into a ZIP archive.
    ArchiveBuild,
}

/// A snapshot of progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled
/// by [`ExtractionConfig::with_batch_size`](crate::ExtractionConfig::with_batch_size).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (frames / archive entries) have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time. Frame extraction never
    /// knows its total up front.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Ordinal of the frame just written (extraction only).
    pub current_ordinal: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] so a single callback can
/// be shared by runs executing on different threads.
///
/// Progress callbacks are **infallible**: they observe but cannot halt
/// the operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an operation.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to stop the
/// associated extraction before its next frame. Frames already written stay
/// on disk.
///
/// # Example
///
/// ```
/// use unanimate::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones of this token observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self, ordinal: Option<u64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(ordinal);
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, ordinal: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                let per_item = elapsed / self.current as u32;
                per_item * remaining as u32
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_ordinal: ordinal,
        };

        self.callback.on_progress(&info);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<ProgressInfo>>,
    }

    impl ProgressCallback for Recording {
        fn on_progress(&self, info: &ProgressInfo) {
            self.seen.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn tracker_reports_every_batch() {
        let recording = Arc::new(Recording::default());
        let mut tracker =
            ProgressTracker::new(recording.clone(), OperationType::FrameExtraction, None, 2);

        for ordinal in 0..5 {
            tracker.advance(Some(ordinal));
        }
        tracker.finish();

        let seen = recording.seen.lock().unwrap();
        let currents: Vec<u64> = seen.iter().map(|info| info.current).collect();
        assert_eq!(currents, vec![2, 4, 5]);
        assert_eq!(seen[0].current_ordinal, Some(1));
        assert!(seen.iter().all(|info| info.percentage.is_none()));
    }

    #[test]
    fn tracker_computes_percentage_when_total_known() {
        let recording = Arc::new(Recording::default());
        let mut tracker =
            ProgressTracker::new(recording.clone(), OperationType::ArchiveBuild, Some(4), 1);

        tracker.advance(None);
        tracker.advance(None);

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen.last().and_then(|info| info.percentage), Some(50.0));
        assert_eq!(seen.last().map(|info| info.operation), Some(OperationType::ArchiveBuild));
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::default();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }
}
