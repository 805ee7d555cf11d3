//! Logger configuration
//!
//! [`LoggerConfig`] is a typed snapshot of every recognised setting. It can be
//! built from a loosely-typed JSON map, where unknown keys are ignored and
//! values of the wrong shape fall back to their defaults.

use super::{error::Result, log_level::LogLevel};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_BACKUPS: usize = 5;
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_EXIT_SYNC_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_INITIAL_CONSUMERS: usize = 3;
pub const DEFAULT_MAX_CONSUMERS: usize = 8;
pub const DEFAULT_FILE_PATH: &str = "./logs/app.log";

/// Producer wait for queue space before forcing a scale-up
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub buffer_size: usize,
    /// Rotation retention; declared for compatibility, not acted on
    pub max_backups: usize,
    /// Rotation threshold; declared for compatibility, not acted on
    pub max_file_size: u64,
    pub enable_color: bool,
    pub output_file: bool,
    pub output_console: bool,
    pub show_caller: bool,
    pub flush_interval: Duration,
    pub exit_sync_delay: Duration,
    pub file_path: PathBuf,
    pub queue_capacity: usize,
    pub initial_consumers: usize,
    pub max_consumers: usize,
    pub enqueue_timeout: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_backups: DEFAULT_MAX_BACKUPS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            enable_color: true,
            output_file: false,
            output_console: true,
            show_caller: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            exit_sync_delay: DEFAULT_EXIT_SYNC_DELAY,
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            initial_consumers: DEFAULT_INITIAL_CONSUMERS,
            max_consumers: DEFAULT_MAX_CONSUMERS,
            enqueue_timeout: DEFAULT_ENQUEUE_TIMEOUT,
        }
    }
}

fn get_bool(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(Value::as_bool)
}

fn get_u64(map: &Map<String, Value>, key: &str) -> Option<u64> {
    let value = map.get(key)?;
    value.as_u64().or_else(|| {
        // Whole, non-negative floats such as 4096.0 are accepted
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn get_usize(map: &Map<String, Value>, key: &str) -> Option<usize> {
    get_u64(map, key).and_then(|v| usize::try_from(v).ok())
}

fn get_positive_usize(map: &Map<String, Value>, key: &str) -> Option<usize> {
    get_usize(map, key).filter(|v| *v > 0)
}

fn get_millis(map: &Map<String, Value>, key: &str) -> Option<Duration> {
    get_u64(map, key).map(Duration::from_millis)
}

impl LoggerConfig {
    /// Build a configuration from a JSON object, defaulting anything missing
    /// or malformed
    ///
    /// # Example
    ///
    /// ```
    /// use dispatch_logger::{LoggerConfig, LogLevel};
    ///
    /// let map = serde_json::json!({ "level": 4, "enable_color": "yes" });
    /// let config = LoggerConfig::from_map(map.as_object().unwrap());
    ///
    /// assert_eq!(config.level, LogLevel::Error);
    /// assert!(config.enable_color); // wrong type, default kept
    /// ```
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let defaults = Self::default();

        let max_consumers =
            get_positive_usize(map, "max_consumers").unwrap_or(defaults.max_consumers);
        let initial_consumers = get_usize(map, "initial_consumers")
            .unwrap_or(defaults.initial_consumers)
            .min(max_consumers);

        Self {
            level: get_u64(map, "level")
                .and_then(LogLevel::from_ordinal)
                .unwrap_or(defaults.level),
            buffer_size: get_positive_usize(map, "buffer_size").unwrap_or(defaults.buffer_size),
            max_backups: get_usize(map, "max_backups").unwrap_or(defaults.max_backups),
            max_file_size: get_u64(map, "max_file_size").unwrap_or(defaults.max_file_size),
            enable_color: get_bool(map, "enable_color").unwrap_or(defaults.enable_color),
            output_file: get_bool(map, "output_file").unwrap_or(defaults.output_file),
            output_console: get_bool(map, "output_console").unwrap_or(defaults.output_console),
            show_caller: get_bool(map, "show_caller").unwrap_or(defaults.show_caller),
            flush_interval: get_millis(map, "flush_interval").unwrap_or(defaults.flush_interval),
            exit_sync_delay: get_millis(map, "exit_sync_delay")
                .unwrap_or(defaults.exit_sync_delay),
            file_path: map
                .get("file_path")
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.file_path),
            queue_capacity: get_positive_usize(map, "queue_capacity")
                .unwrap_or(defaults.queue_capacity),
            initial_consumers,
            max_consumers,
            enqueue_timeout: get_millis(map, "enqueue_timeout")
                .unwrap_or(defaults.enqueue_timeout),
        }
    }

    /// Parse a JSON document; non-object documents yield the defaults
    ///
    /// Only text that is not JSON at all is an error, so callers can
    /// `unwrap_or_default()` without losing partially valid settings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(match value.as_object() {
            Some(map) => Self::from_map(map),
            None => Self::default(),
        })
    }

    /// Clamp consumer counts so `1 <= initial <= max`
    ///
    /// At least one consumer always starts; otherwise records enqueued before
    /// the first scale-up would never be drained on close.
    pub(crate) fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.max_consumers = self.max_consumers.max(1);
        self.initial_consumers = self.initial_consumers.clamp(1, self.max_consumers);
        self.buffer_size = self.buffer_size.max(1);
        self.flush_interval = self.flush_interval.max(Duration::from_millis(1));
        self
    }
}
