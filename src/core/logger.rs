//! Logger facade and dispatch engine
//!
//! Producers fill a pooled [`Record`] and hand it to the bounded
//! [`DispatchQueue`]; an elastic [`ConsumerPool`] drains the queue and runs
//! each record through the hook pipeline, the formatter and the sinks.
//!
//! Locking: the facade state (closed flag, minimum level, formatter, hook
//! pipeline) sits behind one `RwLock`. Producers hold the read side only for
//! the closed/level check; the enqueue itself runs unlocked, so a pending
//! setter never stretches a producer past its enqueue timeout. A producer
//! that loses the race with `close()` finds the queue closed and recycles its
//! record. Lock order is always state, then queue, then the consumer count.

use super::{
    config::LoggerConfig,
    consumer_pool::{ConsumerPool, RecordProcessor},
    dispatch_queue::{DispatchQueue, SendError},
    error::{panic_message, LoggerError},
    error_sink::{ErrorSink, StderrErrorSink},
    fields::{FieldValue, Fields},
    formatter::{Formatter, TextFormatter},
    hook::{Hook, Stage},
    log_context::LogContext,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    pipeline::HookPipeline,
    record::Record,
    record_pool::RecordPool,
    sink::Sink,
};
use parking_lot::{Mutex, RwLock};
use std::panic::Location;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Queue occupancy above which an accepted record triggers a scale-up attempt
pub const SCALE_UP_THRESHOLD: f64 = 0.5;

struct State {
    closed: bool,
    min_level: LogLevel,
    formatter: Arc<dyn Formatter>,
    pipeline: Arc<HookPipeline>,
}

/// Terminal outcome of one dequeued record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Written,
    Skipped,
    Failed,
}

/// Everything producers and consumers share
struct Shared {
    origin: Arc<str>,
    state: RwLock<State>,
    queue: DispatchQueue,
    consumers: Arc<ConsumerPool>,
    records: RecordPool,
    sinks: Vec<Mutex<Box<dyn Sink>>>,
    error_sink: Arc<dyn ErrorSink>,
    metrics: LoggerMetrics,
    enable_color: bool,
    enqueue_timeout: Duration,
    exit_sync_delay: Duration,
}

impl Shared {
    fn report(&self, error: &LoggerError) {
        self.error_sink.report(error);
    }

    fn emit(
        self: &Arc<Self>,
        level: LogLevel,
        message: &str,
        fields: Fields,
        skip: i32,
        caller: &'static Location<'static>,
    ) {
        {
            let state = self.state.read();
            if state.closed || level < state.min_level {
                return;
            }
        }

        let mut record = self.records.acquire();
        let caller = (skip >= 0).then_some(caller);
        record.fill(level, message, fields, skip, caller, &self.origin);
        self.enqueue(record);
    }

    fn enqueue(self: &Arc<Self>, record: Box<Record>) {
        let record = match self.queue.try_send(record) {
            Ok(()) => return self.accepted(),
            Err(SendError::Full(record)) => record,
            Err(err) => return self.refused(err),
        };

        self.metrics.record_block();
        let record = match self.queue.send_timeout(record, self.enqueue_timeout) {
            Ok(()) => return self.accepted(),
            Err(SendError::TimedOut(record)) => record,
            Err(err) => return self.refused(err),
        };

        // The consumers are not keeping up: add one regardless of occupancy,
        // then make a single last attempt.
        self.metrics.record_scale_up_attempt();
        self.spawn_consumer(true);
        match self.queue.try_send(record) {
            Ok(()) => self.accepted(),
            Err(err) => self.refused(err),
        }
    }

    fn accepted(self: &Arc<Self>) {
        self.metrics.record_attempted();
        self.metrics.record_enqueued();
        if self.queue.occupancy() > SCALE_UP_THRESHOLD {
            self.metrics.record_scale_up_attempt();
            self.spawn_consumer(false);
        }
    }

    fn reject(&self, record: Box<Record>) {
        self.metrics.record_attempted();
        self.metrics.record_dropped();
        let waited_ms = u64::try_from(self.enqueue_timeout.as_millis()).unwrap_or(u64::MAX);
        self.report(&LoggerError::dropped(
            record.level,
            self.queue.capacity(),
            waited_ms,
        ));
        self.records.release(record);
    }

    fn refused(&self, err: SendError) {
        match err {
            // Closed between the level check and the send: not a drop.
            SendError::Closed(record) => self.records.release(record),
            other => self.reject(other.into_record()),
        }
    }

    fn spawn_consumer(self: &Arc<Self>, forced: bool) -> bool {
        let processor: Arc<dyn RecordProcessor> = Arc::clone(self) as Arc<dyn RecordProcessor>;
        let started = self.consumers.try_spawn(processor);
        if started {
            self.metrics.record_scale_up(forced);
        }
        started
    }

    fn dispatch(
        &self,
        record: &mut Record,
        formatter: &dyn Formatter,
        pipeline: &HookPipeline,
    ) -> Disposition {
        if self.run_stage(pipeline, Stage::BeforeFormat, record) {
            return Disposition::Skipped;
        }

        let bytes = match formatter.format(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.report(&e);
                return Disposition::Failed;
            }
        };

        if self.run_stage(pipeline, Stage::AfterFormat, record)
            || self.run_stage(pipeline, Stage::BeforeWrite, record)
        {
            return Disposition::Skipped;
        }

        let written = self.write_sinks(record.level, &bytes);

        // The write already happened; a skip here only stops later hooks.
        self.run_stage(pipeline, Stage::AfterWrite, record);

        if written {
            Disposition::Written
        } else {
            Disposition::Failed
        }
    }

    /// Returns whether a hook vetoed the record
    fn run_stage(&self, pipeline: &HookPipeline, stage: Stage, record: &mut Record) -> bool {
        if pipeline.is_empty() {
            return false;
        }

        let outcome = pipeline.run(stage, record);
        if !outcome.errors.is_empty() {
            self.metrics.record_hook_errors(outcome.errors.len());
            for error in &outcome.errors {
                self.report(error);
            }
        }
        outcome.skipped
    }

    /// Write to every sink with per-sink panic isolation
    ///
    /// Succeeds if at least one sink accepted the bytes, or there are none.
    fn write_sinks(&self, level: LogLevel, bytes: &[u8]) -> bool {
        if self.sinks.is_empty() {
            return true;
        }

        let mut any_written = false;
        for sink in &self.sinks {
            let mut sink = sink.lock();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                sink.write(level, bytes)
            }));

            match result {
                Ok(Ok(())) => any_written = true,
                Ok(Err(e)) => self.report(&LoggerError::sink(sink.name(), e.to_string())),
                Err(panic_info) => self.report(&LoggerError::sink(
                    sink.name(),
                    format!("panicked: {}", panic_message(panic_info.as_ref())),
                )),
            }
        }
        any_written
    }

    fn flush_sinks(&self) {
        for sink in &self.sinks {
            let mut sink = sink.lock();
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.flush()));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.report(&LoggerError::sink(
                    sink.name(),
                    format!("flush failed: {}", e),
                )),
                Err(panic_info) => self.report(&LoggerError::sink(
                    sink.name(),
                    format!("panicked during flush: {}", panic_message(panic_info.as_ref())),
                )),
            }
        }
    }

    /// Returns `true` only for the call that performed the shutdown
    fn close(&self) -> bool {
        {
            let mut state = self.state.write();
            if state.closed {
                return false;
            }
            state.closed = true;
            self.consumers.begin_close();
        }

        // Waits for producers still inside a send.
        self.queue.close();
        self.consumers.close_and_wait();
        self.flush_sinks();
        true
    }

    /// Close on a helper thread, waiting at most `limit` for it to finish
    fn close_within(self: &Arc<Self>, limit: Duration) -> bool {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("log-exit-sync".to_string())
            .spawn(move || {
                shared.close();
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(_) => done_rx.recv_timeout(limit).is_ok(),
            Err(e) => {
                eprintln!("[LOGGER ERROR] Failed to start exit sync: {}", e);
                false
            }
        }
    }
}

impl RecordProcessor for Shared {
    fn process(&self, mut record: Box<Record>, _consumer: usize) {
        let (formatter, pipeline) = {
            let state = self.state.read();
            (Arc::clone(&state.formatter), Arc::clone(&state.pipeline))
        };

        match self.dispatch(&mut record, formatter.as_ref(), &pipeline) {
            Disposition::Written => self.metrics.record_written(),
            Disposition::Skipped => self.metrics.record_skipped(),
            Disposition::Failed => self.metrics.record_failed(),
        };

        self.records.release(record);
    }

    fn flush(&self, _consumer: usize) {
        self.flush_sinks();
    }

    fn is_closing(&self) -> bool {
        self.queue.is_closed()
    }

    fn on_panic(&self, error: LoggerError) {
        self.metrics.record_failed();
        self.report(&error);
    }
}

/// Asynchronous logger with an elastic consumer pool
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
///
/// # Example
///
/// ```
/// use dispatch_logger::prelude::*;
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .origin("api")
///     .output_console(false)
///     .colors(false)
///     .sink(sink.clone())
///     .build();
///
/// logger.field("user", 42).info("login");
/// logger.close();
///
/// assert!(sink.contents().contains("[INFO] (api) - login | user=42"));
/// ```
pub struct Logger {
    shared: Arc<Shared>,
}

impl Logger {
    /// Logger with default configuration writing to the console
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self::builder().origin(origin).build()
    }

    #[must_use]
    pub fn from_config(origin: impl Into<String>, config: LoggerConfig) -> Self {
        Self::builder().origin(origin).config(config).build()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Component name stamped on every record
    pub fn origin(&self) -> &str {
        &self.shared.origin
    }

    /// Start a call carrying structured fields
    pub fn with_fields(&self, fields: Fields) -> LogContext<'_> {
        LogContext::new(self).fields(fields)
    }

    /// Start a call carrying one structured field
    pub fn field<K, V>(&self, key: K, value: V) -> LogContext<'_>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        LogContext::new(self).field(key, value)
    }

    /// Start a call with an explicit caller-skip; negative hides the caller
    pub fn caller(&self, skip: i32) -> LogContext<'_> {
        LogContext::new(self).caller(skip)
    }

    /// Emit at `level` without any level-specific side effect
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        LogContext::new(self).log(level, message);
    }

    #[inline]
    #[track_caller]
    pub fn trace(&self, message: impl AsRef<str>) {
        LogContext::new(self).trace(message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        LogContext::new(self).debug(message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        LogContext::new(self).info(message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        LogContext::new(self).warn(message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        LogContext::new(self).error(message);
    }

    /// Emit at PANIC, then panic with the message
    #[track_caller]
    pub fn panic(&self, message: impl AsRef<str>) -> ! {
        LogContext::new(self).panic(message)
    }

    /// Emit at FATAL, give the consumers up to `exit_sync_delay` to drain,
    /// then terminate the process with status 1
    #[track_caller]
    pub fn fatal(&self, message: impl AsRef<str>) -> ! {
        LogContext::new(self).fatal(message)
    }

    pub(crate) fn emit(
        &self,
        level: LogLevel,
        message: &str,
        fields: Fields,
        skip: i32,
        caller: &'static Location<'static>,
    ) {
        self.shared.emit(level, message, fields, skip, caller);
    }

    pub(crate) fn exit_after_sync(&self) -> ! {
        if !self.shared.close_within(self.shared.exit_sync_delay) {
            eprintln!(
                "[LOGGER WARNING] Exit sync did not finish within {:?}. Some logs may be lost.",
                self.shared.exit_sync_delay
            );
        }
        std::process::exit(1)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.shared.state.write().min_level = level;
    }

    pub fn level(&self) -> LogLevel {
        self.shared.state.read().min_level
    }

    /// Replace the formatter; records already being processed keep the old one
    pub fn set_formatter<F: Formatter + 'static>(&self, formatter: F) {
        self.set_shared_formatter(Arc::new(formatter));
    }

    pub fn set_shared_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.shared.state.write().formatter = formatter;
    }

    /// Replace the formatter with a text formatter showing or hiding the
    /// caller location
    ///
    /// Any custom formatter previously installed is discarded.
    pub fn set_show_caller(&self, show: bool) {
        let formatter = TextFormatter::new()
            .with_colors(self.shared.enable_color)
            .with_caller(show);
        self.set_formatter(formatter);
    }

    /// Append a hook; it runs after every hook registered before it
    pub fn add_hook<H: Hook + 'static>(&self, hook: H) {
        self.add_shared_hook(Arc::new(hook));
    }

    pub fn add_shared_hook(&self, hook: Arc<dyn Hook>) {
        let mut state = self.shared.state.write();
        state.pipeline = Arc::new(state.pipeline.with_hook(hook));
    }

    pub fn hook_count(&self) -> usize {
        self.shared.state.read().pipeline.len()
    }

    /// Stop accepting records, drain the queue and wait for every consumer
    ///
    /// Idempotent and safe to call concurrently. Returns `true` for the one
    /// call that performed the shutdown.
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.read().closed
    }

    /// Flush every sink now
    pub fn flush(&self) {
        self.shared.flush_sinks();
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use dispatch_logger::Logger;
    ///
    /// let logger = Logger::builder().output_console(false).build();
    /// logger.info("hello");
    /// logger.close();
    ///
    /// let metrics = logger.metrics();
    /// assert_eq!(metrics.attempted_count(), 1);
    /// assert_eq!(metrics.written_count(), 1);
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    pub fn live_consumers(&self) -> usize {
        self.shared.consumers.live()
    }

    pub fn max_consumers(&self) -> usize {
        self.shared.consumers.max()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    pub fn record_pool(&self) -> &RecordPool {
        &self.shared.records
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if !self.shared.close() {
            return;
        }

        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped logs (drop rate: {:.2}%)",
                dropped,
                self.shared.metrics.drop_rate()
            );
        }
    }
}

#[cfg(feature = "console")]
fn console_sink(config: &LoggerConfig) -> Option<Box<dyn Sink>> {
    config.output_console.then(|| {
        Box::new(crate::sinks::ConsoleSink::with_buffer_size(config.buffer_size)) as Box<dyn Sink>
    })
}

#[cfg(not(feature = "console"))]
fn console_sink(_config: &LoggerConfig) -> Option<Box<dyn Sink>> {
    None
}

#[cfg(feature = "file")]
fn file_sink(config: &LoggerConfig, error_sink: &dyn ErrorSink) -> Option<Box<dyn Sink>> {
    if !config.output_file {
        return None;
    }
    match crate::sinks::FileSink::with_buffer_size(&config.file_path, config.buffer_size) {
        Ok(sink) => Some(Box::new(sink)),
        Err(e) => {
            // Keep logging to the remaining sinks.
            error_sink.report(&e);
            None
        }
    }
}

#[cfg(not(feature = "file"))]
fn file_sink(_config: &LoggerConfig, _error_sink: &dyn ErrorSink) -> Option<Box<dyn Sink>> {
    None
}

/// Builder for constructing Logger with a fluent API
///
/// Console and file sinks come from the configuration; sinks added with
/// [`LoggerBuilder::sink`] are written after them.
///
/// # Example
/// ```
/// use dispatch_logger::prelude::*;
/// use std::time::Duration;
///
/// let logger = Logger::builder()
///     .origin("billing")
///     .min_level(LogLevel::Debug)
///     .queue_capacity(256)
///     .consumers(2, 4)
///     .enqueue_timeout(Duration::from_millis(20))
///     .output_console(false)
///     .build();
///
/// assert_eq!(logger.level(), LogLevel::Debug);
/// assert_eq!(logger.queue_capacity(), 256);
/// assert!(logger.live_consumers() <= 4);
/// ```
pub struct LoggerBuilder {
    origin: String,
    config: LoggerConfig,
    sinks: Vec<Box<dyn Sink>>,
    formatter: Option<Arc<dyn Formatter>>,
    hooks: Vec<Arc<dyn Hook>>,
    error_sink: Arc<dyn ErrorSink>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            origin: String::new(),
            config: LoggerConfig::default(),
            sinks: Vec::new(),
            formatter: None,
            hooks: Vec::new(),
            error_sink: Arc::new(StderrErrorSink),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Consumers started at build time and the ceiling for scale-ups
    #[must_use = "builder methods return a new value"]
    pub fn consumers(mut self, initial: usize, max: usize) -> Self {
        self.config.initial_consumers = initial;
        self.config.max_consumers = max;
        self
    }

    /// How long a producer waits for queue space before forcing a scale-up
    #[must_use = "builder methods return a new value"]
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.config.enqueue_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn exit_sync_delay(mut self, delay: Duration) -> Self {
        self.config.exit_sync_delay = delay;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output_console(mut self, enable: bool) -> Self {
        self.config.output_console = enable;
        self
    }

    /// Also append formatted records to `path`
    #[must_use = "builder methods return a new value"]
    pub fn output_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config.output_file = true;
        self.config.file_path = path.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colors(mut self, enable: bool) -> Self {
        self.config.enable_color = enable;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn show_caller(mut self, show: bool) -> Self {
        self.config.show_caller = show;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Use `formatter` instead of the configured text formatter
    #[must_use = "builder methods return a new value"]
    pub fn formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Where drops, hook errors and sink failures are reported
    #[must_use = "builder methods return a new value"]
    pub fn error_sink<E: ErrorSink + 'static>(mut self, error_sink: E) -> Self {
        self.error_sink = Arc::new(error_sink);
        self
    }

    /// Build the Logger and start its initial consumers
    pub fn build(self) -> Logger {
        let config = self.config.normalized();
        let error_sink = self.error_sink;

        let sinks: Vec<Mutex<Box<dyn Sink>>> = console_sink(&config)
            .into_iter()
            .chain(file_sink(&config, error_sink.as_ref()))
            .chain(self.sinks)
            .map(Mutex::new)
            .collect();

        let formatter = self.formatter.unwrap_or_else(|| {
            Arc::new(
                TextFormatter::new()
                    .with_colors(config.enable_color)
                    .with_caller(config.show_caller),
            )
        });

        let pipeline = self
            .hooks
            .into_iter()
            .fold(HookPipeline::new(), |pipeline, hook| pipeline.with_hook(hook));

        let queue = DispatchQueue::new(config.queue_capacity);
        let consumers = Arc::new(ConsumerPool::new(
            queue.receiver(),
            config.max_consumers,
            config.flush_interval,
        ));

        let shared = Arc::new(Shared {
            origin: Arc::from(self.origin),
            state: RwLock::new(State {
                closed: false,
                min_level: config.level,
                formatter,
                pipeline: Arc::new(pipeline),
            }),
            records: RecordPool::new(config.queue_capacity),
            queue,
            consumers,
            sinks,
            error_sink,
            metrics: LoggerMetrics::new(),
            enable_color: config.enable_color,
            enqueue_timeout: config.enqueue_timeout,
            exit_sync_delay: config.exit_sync_delay,
        });

        for _ in 0..config.initial_consumers {
            let processor: Arc<dyn RecordProcessor> = Arc::clone(&shared) as Arc<dyn RecordProcessor>;
            shared.consumers.try_spawn(processor);
        }

        Logger { shared }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
