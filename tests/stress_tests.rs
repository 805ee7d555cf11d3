//! Stress tests for the elastic dispatch engine
//!
//! These tests verify:
//! - Nothing accepted is lost under sustained concurrent load
//! - Record ownership is exclusive while in transit
//! - The consumer pool grows under pressure and stays within its maximum
//! - Drops are always accounted for

use dispatch_logger::prelude::*;
use dispatch_logger::LoggerError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Counts a violation if two consumers ever hold the same record at once
///
/// Hooks run on every consumer concurrently, so the set spans the whole
/// stretch from hook entry to after the sink write.
struct InFlight {
    held: Mutex<HashSet<String>>,
    violations: Arc<AtomicUsize>,
}

impl Hook for InFlight {
    fn name(&self) -> &str {
        "in_flight"
    }

    fn stages(&self) -> &[Stage] {
        &[Stage::BeforeFormat, Stage::AfterWrite]
    }

    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, record: &mut Record, stage: Stage) -> HookResult {
        let mut held = self.held.lock();
        let consistent = match stage {
            Stage::BeforeFormat => held.insert(record.message.clone()),
            _ => held.remove(&record.message),
        };
        if !consistent {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        drop(held);
        if stage == Stage::BeforeFormat {
            thread::sleep(Duration::from_micros(50));
        }
        HookResult::proceed()
    }
}

/// Counts a violation if the same line is ever written twice
struct UniqueSink {
    seen: Arc<Mutex<HashSet<String>>>,
    violations: Arc<AtomicUsize>,
}

impl Sink for UniqueSink {
    fn write(&mut self, _level: LogLevel, bytes: &[u8]) -> Result<()> {
        let line = String::from_utf8_lossy(bytes).into_owned();
        if !self.seen.lock().insert(line) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "unique"
    }
}

/// Test that every accepted record is written exactly once under heavy load
#[test]
fn test_high_volume_no_duplicates_no_losses() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let violations = Arc::new(AtomicUsize::new(0));
    let logger = Arc::new(
        Logger::builder()
            .origin("stress")
            .output_console(false)
            .colors(false)
            .queue_capacity(64)
            .consumers(2, 8)
            .sink(UniqueSink {
                seen: Arc::clone(&seen),
                violations: Arc::clone(&violations),
            })
            .hook(InFlight {
                held: Mutex::new(HashSet::new()),
                violations: Arc::clone(&violations),
            })
            .error_sink(|_: &LoggerError| {})
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..250 {
                    logger.field("thread", t).info(format!("seq {}-{}", t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }
    logger.close();

    let metrics = logger.metrics();
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.attempted_count(), 2000);
    assert_eq!(
        metrics.attempted_count(),
        metrics.enqueued_count() + metrics.dropped_count()
    );
    assert_eq!(seen.lock().len() as u64, metrics.written_count());
    assert_eq!(metrics.enqueued_count(), metrics.written_count());
    assert!(logger.live_consumers() == 0);
}

/// Test that a slow sink forces the pool to grow, but never past its maximum
#[test]
fn test_pool_grows_under_pressure() {
    struct SlowSink;

    impl Sink for SlowSink {
        fn write(&mut self, _level: LogLevel, _bytes: &[u8]) -> Result<()> {
            thread::sleep(Duration::from_millis(2));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    let logger = Arc::new(
        Logger::builder()
            .output_console(false)
            .queue_capacity(16)
            .consumers(1, 4)
            .enqueue_timeout(Duration::from_millis(10))
            .sink(SlowSink)
            .error_sink(|_: &LoggerError| {})
            .build(),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..100 {
                    logger.info(format!("pressure {}", i));
                    assert!(logger.live_consumers() <= 4);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let metrics = logger.metrics();
    assert!(metrics.scale_ups() + metrics.forced_scale_ups() >= 1);
    assert!(metrics.scale_ups() + metrics.forced_scale_ups() <= 3);

    logger.close();
    assert_eq!(
        metrics.enqueued_count() + metrics.dropped_count(),
        metrics.attempted_count()
    );
    assert_eq!(metrics.enqueued_count(), metrics.processed_count());
}

/// Test that drops under overflow are all reported
#[test]
fn test_every_drop_is_reported() {
    struct StuckSink;

    impl Sink for StuckSink {
        fn write(&mut self, _level: LogLevel, _bytes: &[u8]) -> Result<()> {
            thread::sleep(Duration::from_millis(20));
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "stuck"
        }
    }

    let reported = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reported);
    let logger = Logger::builder()
        .output_console(false)
        .queue_capacity(2)
        .consumers(1, 1)
        .enqueue_timeout(Duration::from_millis(1))
        .sink(StuckSink)
        .error_sink(move |e: &LoggerError| {
            if matches!(e, LoggerError::RecordDropped { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    for i in 0..30 {
        logger.error(format!("overflow {}", i));
    }
    logger.close();

    let metrics = logger.metrics();
    assert!(metrics.dropped_count() > 0);
    assert_eq!(reported.load(Ordering::SeqCst) as u64, metrics.dropped_count());
    assert_eq!(metrics.written_count() + metrics.dropped_count(), 30);
    assert!(metrics.drop_rate() > 0.0);
}

/// Test that concurrent file logging produces complete, unbroken lines
#[test]
fn test_concurrent_file_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent.log");

    let logger = Arc::new(
        Logger::builder()
            .origin("files")
            .output_console(false)
            .colors(false)
            .output_file(&log_file)
            .queue_capacity(4096)
            .consumers(4, 4)
            .build(),
    );

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..500 {
                    logger.warn(format!("thread {} line {}", t, i));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer panicked");
    }
    logger.close();

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len() as u64, logger.metrics().written_count());
    assert!(lines
        .iter()
        .all(|line| line.contains("[WARN] (files) - thread ")));
}
