//! Log record structure

use super::fields::Fields;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::panic::Location;
use std::sync::Arc;

/// Default caller-skip depth; negative values disable caller rendering
pub const DEFAULT_CALLER_SKIP: i32 = 0;

/// One log event travelling through the dispatch pipeline
///
/// Records move through the queue as `Box<Record>`, so exactly one component
/// owns a record at any time: the producer, the queue, then one consumer.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Already escaped: newlines, carriage returns and tabs arrive as `\n`,
    /// `\r` and `\t`, including in `BeforeFormat` hooks.
    pub message: String,
    pub fields: Fields,
    pub skip: i32,
    pub caller: Option<&'static Location<'static>>,
    pub origin: Arc<str>,
}

impl Record {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            level: LogLevel::default(),
            message: String::new(),
            fields: Fields::with_capacity(8),
            skip: DEFAULT_CALLER_SKIP,
            caller: None,
            origin: Arc::from(""),
        }
    }

    /// Populate a pooled record for a new event
    ///
    /// Incoming fields are merged into the (empty) pooled map so its
    /// allocation is reused.
    pub fn fill(
        &mut self,
        level: LogLevel,
        message: &str,
        fields: Fields,
        skip: i32,
        caller: Option<&'static Location<'static>>,
        origin: &Arc<str>,
    ) {
        self.timestamp = Utc::now();
        self.level = level;
        self.message = Self::sanitize_message(message);
        self.fields.merge(fields);
        self.skip = skip;
        self.caller = caller;
        self.origin = Arc::clone(origin);
    }

    /// Clear per-event state before the record goes back to the pool
    pub fn reset(&mut self) {
        self.timestamp = DateTime::<Utc>::UNIX_EPOCH;
        self.level = LogLevel::default();
        self.message.clear();
        self.fields.clear();
        self.skip = DEFAULT_CALLER_SKIP;
        self.caller = None;
    }

    /// Builder used by tests and custom formatters
    pub fn with_message(level: LogLevel, message: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.timestamp = Utc::now();
        record.level = level;
        record.message = Self::sanitize_message(&message.into());
        record
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.merge(fields);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Arc::from(origin);
        self
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
