//! Logger metrics for observability
//!
//! Counters for every outcome a record can have, so that
//! `attempted == enqueued + dropped` and, once the consumers are idle,
//! `enqueued == written + skipped + failed`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for logger observability
///
/// # Example
///
/// ```
/// use dispatch_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_attempted();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.drop_rate(), 100.0);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records that passed the level check and tried to enqueue
    attempted: AtomicU64,

    /// Records accepted by the dispatch queue
    enqueued: AtomicU64,

    /// Records dropped because the queue stayed full
    dropped: AtomicU64,

    /// Records written to the sinks
    written: AtomicU64,

    /// Records vetoed by a hook before writing
    skipped: AtomicU64,

    /// Records lost to formatter errors or panics during processing
    failed: AtomicU64,

    /// Errors reported by hooks
    hook_errors: AtomicU64,

    /// Times a producer waited for queue space
    block_events: AtomicU64,

    /// Consumers started by the occupancy policy
    scale_ups: AtomicU64,

    /// Consumers started after the queue stayed full
    forced_scale_ups: AtomicU64,

    /// Times the scale-up policy was evaluated with occupancy over threshold
    scale_up_attempts: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            attempted: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            written: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            hook_errors: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            scale_ups: AtomicU64::new(0),
            forced_scale_ups: AtomicU64::new(0),
            scale_up_attempts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn attempted_count(&self) -> u64 {
        self.attempted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped_count(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hook_error_count(&self) -> u64 {
        self.hook_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn scale_ups(&self) -> u64 {
        self.scale_ups.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn forced_scale_ups(&self) -> u64 {
        self.forced_scale_ups.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn scale_up_attempts(&self) -> u64 {
        self.scale_up_attempts.load(Ordering::Relaxed)
    }

    /// Records that reached a terminal outcome inside the consumers
    pub fn processed_count(&self) -> u64 {
        self.written_count() + self.skipped_count() + self.failed_count()
    }

    #[inline]
    pub fn record_attempted(&self) -> u64 {
        self.attempted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a dropped record; returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_skipped(&self) -> u64 {
        self.skipped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_hook_errors(&self, count: usize) {
        if count > 0 {
            self.hook_errors.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_scale_up(&self, forced: bool) {
        if forced {
            self.forced_scale_ups.fetch_add(1, Ordering::Relaxed);
        } else {
            self.scale_ups.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_scale_up_attempt(&self) -> u64 {
        self.scale_up_attempts.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been attempted.
    pub fn drop_rate(&self) -> f64 {
        let attempted = self.attempted_count() as f64;
        if attempted == 0.0 {
            0.0
        } else {
            (self.dropped_count() as f64 / attempted) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            attempted: AtomicU64::new(self.attempted_count()),
            enqueued: AtomicU64::new(self.enqueued_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            written: AtomicU64::new(self.written_count()),
            skipped: AtomicU64::new(self.skipped_count()),
            failed: AtomicU64::new(self.failed_count()),
            hook_errors: AtomicU64::new(self.hook_error_count()),
            block_events: AtomicU64::new(self.block_events()),
            scale_ups: AtomicU64::new(self.scale_ups()),
            forced_scale_ups: AtomicU64::new(self.forced_scale_ups()),
            scale_up_attempts: AtomicU64::new(self.scale_up_attempts()),
        }
    }
}
