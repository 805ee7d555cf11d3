//! In-memory sink
//!
//! Useful for embedding the logger where output is collected by the host,
//! and for asserting on exact output bytes.

use crate::core::{LogLevel, Result, Sink};
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink writing into a shared buffer; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<Vec<LogLevel>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Number of write calls received
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Levels of the written records, in write order
    pub fn levels(&self) -> Vec<LogLevel> {
        self.writes.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
        self.writes.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&mut self, level: LogLevel, bytes: &[u8]) -> Result<()> {
        self.buffer.lock().extend_from_slice(bytes);
        self.writes.lock().push(level);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
