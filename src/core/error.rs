//! Error types for the logger system

use super::{hook::Stage, log_level::LogLevel};

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Record dropped because the dispatch queue stayed full
    #[error("Log queue full: dropped {level} record after {waited_ms}ms ({capacity} slots)")]
    RecordDropped {
        level: LogLevel,
        capacity: usize,
        waited_ms: u64,
    },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// A hook reported a failure
    #[error("Hook '{hook}' failed at {stage}: {message}")]
    HookError {
        hook: String,
        stage: Stage,
        message: String,
    },

    /// A hook panicked while firing
    #[error("Hook '{hook}' panicked at {stage}: {message}")]
    HookPanicked {
        hook: String,
        stage: Stage,
        message: String,
    },

    /// Sink write or flush failure
    #[error("Sink '{sink}' failed: {message}")]
    SinkError { sink: String, message: String },

    /// A consumer panicked while processing a record
    #[error("Consumer #{consumer} panicked: {message}")]
    ConsumerPanicked { consumer: usize, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a dropped-record error
    pub fn dropped(level: LogLevel, capacity: usize, waited_ms: u64) -> Self {
        LoggerError::RecordDropped {
            level,
            capacity,
            waited_ms,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a hook error
    pub fn hook(hook: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        LoggerError::HookError {
            hook: hook.into(),
            stage,
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

/// Extract a readable message from a `catch_unwind` payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
