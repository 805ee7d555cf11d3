//! Core logger types and traits

pub mod config;
pub mod consumer_pool;
pub mod dispatch_queue;
pub mod error;
pub mod error_sink;
pub mod fields;
pub mod formatter;
pub mod hook;
pub mod log_context;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod record_pool;
pub mod sink;
pub mod timestamp;

pub use config::LoggerConfig;
pub use consumer_pool::{ConsumerPool, ConsumerState, RecordProcessor};
pub use dispatch_queue::{DispatchQueue, SendError};
pub use error::{LoggerError, Result};
pub use error_sink::{ErrorSink, StderrErrorSink};
pub use fields::{FieldValue, Fields};
pub use formatter::{Formatter, JsonFormatter, LevelPalette, TextFormatter};
pub use hook::{Hook, HookResult, Stage};
pub use log_context::LogContext;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, SCALE_UP_THRESHOLD};
pub use metrics::LoggerMetrics;
pub use pipeline::{HookPipeline, StageOutcome};
pub use record::{Record, DEFAULT_CALLER_SKIP};
pub use record_pool::RecordPool;
pub use sink::Sink;
pub use timestamp::TimestampFormat;
