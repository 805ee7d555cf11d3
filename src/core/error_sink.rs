//! Destination for the logger's own failures
//!
//! Drops, hook errors and formatter errors are reported here, never to the
//! record's own sinks, so a failing sink cannot feed back into itself.

use super::error::LoggerError;
use std::io::Write;

pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &LoggerError);
}

/// Writes `[LOGGER ERROR] ...` lines to standard error
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrErrorSink;

impl ErrorSink for StderrErrorSink {
    fn report(&self, error: &LoggerError) {
        let prefix = match error {
            LoggerError::RecordDropped { .. } => "[LOGGER WARNING]",
            LoggerError::HookPanicked { .. } | LoggerError::ConsumerPanicked { .. } => {
                "[LOGGER CRITICAL]"
            }
            _ => "[LOGGER ERROR]",
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{} {}", prefix, error);
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&LoggerError) + Send + Sync,
{
    fn report(&self, error: &LoggerError) {
        self(error)
    }
}
