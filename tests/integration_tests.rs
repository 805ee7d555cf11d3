//! Integration tests for the dispatch logger
//!
//! These tests verify:
//! - Hook veto, redaction and error isolation
//! - Shutdown under concurrent load
//! - Bounded producer latency with a stalled sink
//! - File output, runtime formatter swaps and configuration maps

use dispatch_logger::prelude::*;
use dispatch_logger::LoggerError;
use parking_lot::{Condvar, Mutex};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn memory_builder(sink: &MemorySink) -> LoggerBuilder {
    Logger::builder()
        .origin("it")
        .output_console(false)
        .colors(false)
        .sink(sink.clone())
}

/// Collects everything reported to the error sink
#[derive(Clone, Default)]
struct Reports(Arc<Mutex<Vec<String>>>);

impl Reports {
    fn sink(&self) -> impl Fn(&LoggerError) + Send + Sync + 'static {
        let reports = Arc::clone(&self.0);
        move |e: &LoggerError| reports.lock().push(e.to_string())
    }

    fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Sink whose writes block until the gate opens
#[derive(Clone, Default)]
struct GatedSink {
    gate: Arc<(Mutex<bool>, Condvar)>,
    inner: MemorySink,
}

impl GatedSink {
    fn open(&self) {
        let (open, cvar) = &*self.gate;
        *open.lock() = true;
        cvar.notify_all();
    }
}

impl Sink for GatedSink {
    fn write(&mut self, level: LogLevel, bytes: &[u8]) -> Result<()> {
        let (open, cvar) = &*self.gate;
        let mut open = open.lock();
        while !*open {
            cvar.wait(&mut open);
        }
        drop(open);
        self.inner.write(level, bytes)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

struct VetoErrors;

impl Hook for VetoErrors {
    fn name(&self) -> &str {
        "veto_errors"
    }

    fn stages(&self) -> &[Stage] {
        &[Stage::BeforeFormat]
    }

    fn levels(&self) -> &[LogLevel] {
        &[LogLevel::Error]
    }

    fn fire(&self, _record: &mut Record, _stage: Stage) -> HookResult {
        HookResult::skip()
    }
}

struct Failing {
    stage: Stage,
}

impl Hook for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn stages(&self) -> &[Stage] {
        std::slice::from_ref(&self.stage)
    }

    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, _record: &mut Record, stage: Stage) -> HookResult {
        HookResult::failed(LoggerError::hook("failing", stage, "audit backend unreachable"))
    }
}

#[test]
fn test_log_injection_prevention() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("injection_test.log");

    let logger = Logger::builder()
        .origin("auth")
        .output_console(false)
        .colors(false)
        .output_file(&log_file)
        .build();

    // Try to inject fake log entries with newlines
    logger.info("User login\nERROR [2024-10-17] Fake error injected\nINFO Continuation");
    logger.close();

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert!(content.contains("\\n"));
    assert_eq!(content.lines().count(), 1, "Log should be a single line");
}

#[test]
fn test_before_format_skip_vetoes_only_error_records() {
    let sink = MemorySink::new();
    let logger = memory_builder(&sink).hook(VetoErrors).build();

    logger.info("kept");
    logger.error("vetoed");
    logger.info("also kept");
    logger.error("vetoed again");
    logger.close();

    assert_eq!(sink.levels(), vec![LogLevel::Info, LogLevel::Info]);
    assert!(!sink.contents().contains("vetoed"));
    assert_eq!(logger.metrics().skipped_count(), 2);
    assert_eq!(logger.metrics().written_count(), 2);
}

#[test]
fn test_redaction_hook_masks_phone_numbers() {
    let sink = MemorySink::new();
    let logger = memory_builder(&sink).build();
    logger.add_hook(RedactHook::new().expect("phone pattern compiles"));

    logger
        .field("channel", "sms")
        .info("verification code sent to 13812345678");
    logger.close();

    let output = sink.contents();
    assert!(output.contains("verification code sent to 138****5678"));
    assert!(!output.contains("13812345678"));
}

#[test]
fn test_close_during_concurrent_emits() {
    let sink = MemorySink::new();
    let reports = Reports::default();
    let logger = Arc::new(
        memory_builder(&sink)
            .min_level(LogLevel::Trace)
            .queue_capacity(16)
            .consumers(2, 4)
            .error_sink(reports.sink())
            .build(),
    );

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                logger.field("producer", i).info(format!("in flight {}", i));
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(1));
    assert!(logger.close());

    for handle in handles {
        handle.join().expect("producer panicked");
    }

    assert_eq!(logger.live_consumers(), 0);
    assert_eq!(logger.queue_len(), 0);

    let metrics = logger.metrics();
    assert_eq!(
        metrics.attempted_count(),
        metrics.enqueued_count() + metrics.dropped_count()
    );
    assert_eq!(metrics.enqueued_count(), metrics.written_count());
    assert_eq!(sink.write_count() as u64, metrics.written_count());

    let drop_reports = reports
        .all()
        .iter()
        .filter(|r| r.contains("dropped"))
        .count();
    assert_eq!(drop_reports as u64, metrics.dropped_count());
}

#[test]
fn test_concurrent_double_close() {
    let sink = MemorySink::new();
    let logger = Arc::new(memory_builder(&sink).build());
    for i in 0..50 {
        logger.info(format!("before close {}", i));
    }

    let closers: Vec<_> = (0..2)
        .map(|_| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || logger.close())
        })
        .collect();
    let drained: Vec<bool> = closers
        .into_iter()
        .map(|h| h.join().expect("close panicked"))
        .collect();

    assert_eq!(drained.iter().filter(|d| **d).count(), 1);
    assert_eq!(logger.live_consumers(), 0);
    assert_eq!(sink.write_count(), 50);
}

#[test]
fn test_stalled_sink_bounds_emit_latency_and_scales_up() {
    let timeout = Duration::from_millis(50);
    let sink = GatedSink::default();
    let reports = Reports::default();
    let logger = Logger::builder()
        .origin("slow")
        .output_console(false)
        .queue_capacity(4)
        .consumers(3, 5)
        .enqueue_timeout(timeout)
        .sink(sink.clone())
        .error_sink(reports.sink())
        .build();

    let slack = Duration::from_millis(250);
    for i in 0..5 {
        let start = Instant::now();
        logger.info(format!("record {}", i));
        assert!(
            start.elapsed() < timeout + slack,
            "emit {} blocked for {:?}",
            i,
            start.elapsed()
        );
    }

    // Three consumers can hold at most three records; the rest fill the queue.
    for i in 5..8 {
        let start = Instant::now();
        logger.info(format!("record {}", i));
        assert!(start.elapsed() < timeout + slack);
    }

    let metrics = logger.metrics();
    assert!(metrics.scale_up_attempts() >= 1);
    assert!(logger.live_consumers() <= 5);

    sink.open();
    logger.close();

    assert_eq!(
        metrics.attempted_count(),
        metrics.enqueued_count() + metrics.dropped_count()
    );
    assert_eq!(
        sink.inner.write_count() as u64 + metrics.dropped_count(),
        8,
        "every record is either written or reported dropped"
    );
    assert_eq!(
        reports.all().len() as u64,
        metrics.dropped_count(),
        "each drop is reported once"
    );
}

#[test]
fn test_consumer_count_never_exceeds_max() {
    let sink = GatedSink::default();
    let logger = Arc::new(
        Logger::builder()
            .output_console(false)
            .queue_capacity(8)
            .consumers(1, 3)
            .enqueue_timeout(Duration::from_millis(5))
            .sink(sink.clone())
            .error_sink(|_: &LoggerError| {})
            .build(),
    );

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let mut max_seen = 0;
                for i in 0..40 {
                    logger.info(format!("p{} m{}", p, i));
                    max_seen = max_seen.max(logger.live_consumers());
                }
                max_seen
            })
        })
        .collect();

    let max_seen = producers
        .into_iter()
        .map(|h| h.join().expect("producer panicked"))
        .max()
        .unwrap_or(0);

    assert!(max_seen <= 3, "observed {} live consumers", max_seen);
    assert_eq!(logger.live_consumers(), 3);

    sink.open();
    logger.close();
    assert_eq!(logger.live_consumers(), 0);
}

#[test]
fn test_pending_setter_does_not_stretch_emit_latency() {
    let timeout = Duration::from_millis(200);
    let sink = GatedSink::default();
    let logger = Arc::new(
        Logger::builder()
            .output_console(false)
            .queue_capacity(1)
            .consumers(1, 1)
            .enqueue_timeout(timeout)
            .sink(sink.clone())
            .error_sink(|_: &LoggerError| {})
            .build(),
    );

    // r0 parks the only consumer in the sink, r1 fills the queue.
    logger.info("r0");
    let deadline = Instant::now() + Duration::from_secs(2);
    while logger.queue_len() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    logger.info("r1");

    let blocked = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || logger.info("r2"))
    };
    thread::sleep(Duration::from_millis(20));

    let setter = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || {
            let start = Instant::now();
            logger.set_level(LogLevel::Trace);
            start.elapsed()
        })
    };
    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    logger.info("r3");
    let elapsed = start.elapsed();
    assert!(
        elapsed < timeout + Duration::from_millis(100),
        "emit blocked for {:?}",
        elapsed
    );

    let setter_wait = setter.join().expect("setter panicked");
    assert!(setter_wait < timeout, "set_level waited {:?}", setter_wait);
    assert_eq!(logger.level(), LogLevel::Trace);

    blocked.join().expect("producer panicked");
    sink.open();
    logger.close();

    let metrics = logger.metrics();
    assert_eq!(metrics.attempted_count(), 4);
    assert_eq!(
        metrics.attempted_count(),
        metrics.enqueued_count() + metrics.dropped_count()
    );
}

#[test]
fn test_emit_racing_close_is_not_a_drop() {
    let sink = MemorySink::new();
    let reports = Reports::default();
    let logger = Arc::new(
        memory_builder(&sink)
            .queue_capacity(1)
            .consumers(1, 1)
            .enqueue_timeout(Duration::from_millis(20))
            .error_sink(reports.sink())
            .build(),
    );

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for j in 0..20 {
                    logger.info(format!("race {}-{}", i, j));
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(5));
    assert!(logger.close());
    for handle in handles {
        handle.join().expect("producer panicked");
    }

    let metrics = logger.metrics();
    assert_eq!(
        metrics.attempted_count(),
        metrics.enqueued_count() + metrics.dropped_count()
    );
    assert_eq!(metrics.enqueued_count(), metrics.written_count());
    assert_eq!(sink.write_count() as u64, metrics.written_count());
    assert_eq!(reports.all().len() as u64, metrics.dropped_count());
    assert_eq!(logger.live_consumers(), 0);
}

#[test]
fn test_before_format_hooks_see_escaped_message() {
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Hook for Capture {
        fn name(&self) -> &str {
            "capture"
        }

        fn stages(&self) -> &[Stage] {
            &[Stage::BeforeFormat]
        }

        fn levels(&self) -> &[LogLevel] {
            &LogLevel::ALL
        }

        fn fire(&self, record: &mut Record, _stage: Stage) -> HookResult {
            self.0.lock().push(record.message.clone());
            HookResult::proceed()
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = MemorySink::new();
    let logger = memory_builder(&sink)
        .hook(Capture(Arc::clone(&seen)))
        .build();

    logger.info("line one\nline two\tend");
    logger.close();

    assert_eq!(*seen.lock(), vec!["line one\\nline two\\tend".to_string()]);
}

#[test]
fn test_hook_errors_go_to_error_sink_only() {
    let sink = MemorySink::new();
    let reports = Reports::default();
    let logger = memory_builder(&sink)
        .hook(Failing {
            stage: Stage::BeforeWrite,
        })
        .error_sink(reports.sink())
        .build();

    logger.warn("still written");
    logger.close();

    assert_eq!(sink.lines().len(), 1);
    assert!(!sink.contents().contains("audit backend"));
    assert_eq!(reports.all().len(), 1);
    assert!(reports.all()[0].contains("audit backend unreachable"));
    assert_eq!(logger.metrics().hook_error_count(), 1);
}

#[test]
fn test_after_write_skip_does_not_undo_write() {
    struct LateVeto;

    impl Hook for LateVeto {
        fn name(&self) -> &str {
            "late_veto"
        }

        fn stages(&self) -> &[Stage] {
            &[Stage::AfterWrite]
        }

        fn levels(&self) -> &[LogLevel] {
            &LogLevel::ALL
        }

        fn fire(&self, _record: &mut Record, _stage: Stage) -> HookResult {
            HookResult::skip()
        }
    }

    let sink = MemorySink::new();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mirror = temp_dir.path().join("mirror.log");

    let logger = memory_builder(&sink)
        .hook(LateVeto)
        .hook(FileWriteHook::new(&mirror))
        .build();

    logger.info("already out");
    logger.close();

    assert_eq!(sink.lines().len(), 1);
    assert_eq!(logger.metrics().written_count(), 1);
    // The veto stops the hooks registered after it.
    assert!(!mirror.exists());
}

#[test]
fn test_file_write_hook_mirrors_records() {
    let sink = MemorySink::new();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mirror = temp_dir.path().join("audit.log");

    let logger = memory_builder(&sink)
        .colors(true)
        .hook(FileWriteHook::new(&mirror))
        .build();

    logger.field("user", "ada").warn("password changed");
    logger.close();

    let mirrored = fs::read_to_string(&mirror).expect("read mirror");
    assert!(mirrored.ends_with("[WARN] (it) - password changed | user=ada\n"));
    assert!(!mirrored.contains('\x1b'), "mirror output is uncoloured");
    assert!(sink.contents().contains('\x1b'), "primary output is coloured");
}

#[test]
fn test_formatter_error_skips_write() {
    struct Picky;

    impl Formatter for Picky {
        fn format(&self, record: &Record) -> Result<Vec<u8>> {
            if record.message.contains("bad") {
                return Err(LoggerError::formatter("picky", "refusing record"));
            }
            Ok(format!("{}\n", record.message).into_bytes())
        }

        fn name(&self) -> &str {
            "picky"
        }
    }

    let sink = MemorySink::new();
    let reports = Reports::default();
    let logger = memory_builder(&sink)
        .formatter(Picky)
        .error_sink(reports.sink())
        .build();

    logger.info("good");
    logger.info("bad");
    logger.close();

    assert_eq!(sink.lines(), vec!["good"]);
    assert_eq!(logger.metrics().failed_count(), 1);
    assert_eq!(reports.all().len(), 1);
}

#[test]
fn test_runtime_formatter_swap_to_json() {
    let sink = MemorySink::new();
    let logger = memory_builder(&sink).consumers(1, 1).build();

    logger.set_formatter(JsonFormatter::new());
    logger.field("status", 200).info("served");
    logger.close();

    let line = sink.lines().pop().expect("one line");
    let value: serde_json::Value = serde_json::from_str(&line).expect("valid json line");
    assert_eq!(value["level"], "INFO");
    assert_eq!(value["origin"], "it");
    assert_eq!(value["message"], "served");
    assert_eq!(value["fields"]["status"], 200);
}

#[test]
fn test_file_output_from_config_map() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("logs/app.log");

    let settings = serde_json::json!({
        "level": 1,
        "enable_color": false,
        "output_console": false,
        "output_file": true,
        "file_path": log_file.to_str().expect("utf-8 path"),
        "show_caller": "not a bool"
    });
    let config = LoggerConfig::from_map(settings.as_object().expect("object"));
    let logger = Logger::from_config("cfg", config);

    logger.trace("below level");
    logger.debug("at level");
    logger.close();

    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("[DEBUG] (cfg) - at level"));
}

#[test]
fn test_set_level_at_runtime() {
    let sink = MemorySink::new();
    let logger = memory_builder(&sink).build();

    logger.debug("hidden");
    logger.set_level(LogLevel::Trace);
    assert_eq!(logger.level(), LogLevel::Trace);
    logger.debug("visible");
    logger.close();

    assert_eq!(sink.lines().len(), 1);
    assert!(sink.contents().contains("visible"));
}
