//! Per-call logging context
//!
//! `LogContext` carries structured fields and a caller-skip for exactly one
//! emit. It borrows the logger and is consumed by the emit, so a context
//! can never leak into a second record.
//!
//! ```
//! use dispatch_logger::prelude::*;
//!
//! let sink = MemorySink::new();
//! let logger = Logger::builder()
//!     .origin("orders")
//!     .output_console(false)
//!     .colors(false)
//!     .sink(sink.clone())
//!     .build();
//!
//! logger
//!     .field("order_id", 1001)
//!     .field("status", "paid")
//!     .info("order updated");
//! logger.close();
//!
//! assert!(sink.contents().ends_with("- order updated | order_id=1001, status=paid\n"));
//! ```

use super::{
    fields::{FieldValue, Fields},
    log_level::LogLevel,
    logger::Logger,
    record::DEFAULT_CALLER_SKIP,
};
use std::panic::Location;

#[must_use = "a log context does nothing until one of its emit methods is called"]
pub struct LogContext<'a> {
    logger: &'a Logger,
    fields: Fields,
    skip: i32,
}

impl<'a> LogContext<'a> {
    pub(crate) fn new(logger: &'a Logger) -> Self {
        Self {
            logger,
            fields: Fields::new(),
            skip: DEFAULT_CALLER_SKIP,
        }
    }

    /// Add a field; a later value for the same key wins
    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key, value);
        self
    }

    /// Merge a set of fields into the context
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields.merge(fields);
        self
    }

    /// Caller-skip depth for this emit
    ///
    /// A negative value hides the caller location even when the formatter
    /// shows callers. Deeper frames are reached by marking wrapper functions
    /// `#[track_caller]`.
    pub fn caller(mut self, skip: i32) -> Self {
        self.skip = skip;
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[track_caller]
    pub fn log(self, level: LogLevel, message: impl AsRef<str>) {
        self.logger.emit(
            level,
            message.as_ref(),
            self.fields,
            self.skip,
            Location::caller(),
        );
    }

    #[track_caller]
    pub fn trace(self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    #[track_caller]
    pub fn debug(self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[track_caller]
    pub fn info(self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[track_caller]
    pub fn warn(self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    #[track_caller]
    pub fn error(self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    /// Emit at PANIC, then panic with the same message
    #[track_caller]
    pub fn panic(self, message: impl AsRef<str>) -> ! {
        let message = message.as_ref().to_string();
        self.log(LogLevel::Panic, &message);
        panic!("{}", message)
    }

    /// Emit at FATAL, wait up to the exit sync delay, then exit with status 1
    #[track_caller]
    pub fn fatal(self, message: impl AsRef<str>) -> ! {
        let logger = self.logger;
        self.log(LogLevel::Fatal, message);
        logger.exit_after_sync()
    }
}
