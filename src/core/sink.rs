//! Sink trait for log output destinations

use super::{error::Result, log_level::LogLevel};

pub trait Sink: Send {
    /// Write one formatted record
    fn write(&mut self, level: LogLevel, bytes: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
