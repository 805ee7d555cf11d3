//! # Dispatch Logger
//!
//! An asynchronous logging engine: producers enqueue pooled records into a
//! bounded queue and an elastic pool of consumer threads runs them through
//! a hook pipeline, a formatter and the configured sinks.
//!
//! ## Features
//!
//! - **Non-blocking emit**: a full queue costs at most a bounded wait, then
//!   a forced scale-up, then a reported drop
//! - **Elastic consumers**: more consumers start as the queue fills, up to a
//!   configured ceiling
//! - **Hooks**: interceptors at four fixed stages can rewrite or veto records
//! - **Clean shutdown**: `close()` drains every accepted record exactly once
//!
//! ```
//! use dispatch_logger::prelude::*;
//!
//! let logger = Logger::builder()
//!     .origin("api")
//!     .output_console(false)
//!     .hook(RedactHook::new().expect("phone pattern compiles"))
//!     .build();
//!
//! logger.field("path", "/users").info("request from 13812345678");
//! logger.close();
//! ```

pub mod core;
pub mod hooks;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        FieldValue, Fields, Formatter, Hook, HookResult, JsonFormatter, LogContext, LogLevel,
        Logger, LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Record, Result, Sink,
        Stage, TextFormatter, TimestampFormat,
    };
    pub use crate::hooks::{FileWriteHook, RedactHook};
    pub use crate::sinks::MemorySink;
    #[cfg(feature = "console")]
    pub use crate::sinks::ConsoleSink;
    #[cfg(feature = "file")]
    pub use crate::sinks::FileSink;
}

pub use core::{
    ConsumerPool, ConsumerState, DispatchQueue, ErrorSink, FieldValue, Fields, Formatter, Hook,
    HookPipeline, HookResult, JsonFormatter, LevelPalette, LogContext, LogLevel, Logger,
    LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, Record, RecordPool, RecordProcessor,
    Result, SendError, Sink, Stage, StageOutcome, StderrErrorSink, TextFormatter,
    TimestampFormat,
};
pub use hooks::{FileWriteHook, RedactHook};
pub use sinks::MemorySink;
#[cfg(feature = "console")]
pub use sinks::ConsoleSink;
#[cfg(feature = "file")]
pub use sinks::FileSink;
