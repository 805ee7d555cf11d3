//! Console sink implementation

use crate::core::{LogLevel, Result, Sink};
use std::io::{BufWriter, Stderr, Stdout, Write};

/// Buffered standard output / standard error sink
///
/// Records at ERROR and above go to stderr, everything else to stdout. The
/// logger wraps the sink in a mutex shared by all consumers, so lines from
/// different consumers never interleave.
pub struct ConsoleSink {
    stdout: BufWriter<Stdout>,
    stderr: BufWriter<Stderr>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_buffer_size(crate::core::config::DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            stdout: BufWriter::with_capacity(buffer_size, std::io::stdout()),
            stderr: BufWriter::with_capacity(buffer_size, std::io::stderr()),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, level: LogLevel, bytes: &[u8]) -> Result<()> {
        if level.is_error() {
            self.stderr.write_all(bytes)?;
            // Error lines are not held back behind a partially filled buffer
            self.stderr.flush()?;
        } else {
            self.stdout.write_all(bytes)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stdout.flush()?;
        self.stderr.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        let _ = Sink::flush(self);
    }
}
