//! Hook mirroring written records into a side file

use crate::core::{
    Formatter, Hook, HookResult, LogLevel, LoggerError, Record, Result, Stage, TextFormatter,
};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends an uncoloured copy of every written record to a file
///
/// The file is opened on the first record, so a logger that never writes
/// never creates it. Open and write failures are reported through the
/// logger's error sink and do not affect the primary sinks.
pub struct FileWriteHook {
    path: PathBuf,
    file: Mutex<Option<File>>,
    formatter: TextFormatter,
}

impl FileWriteHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            formatter: TextFormatter::new().with_colors(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and release the file handle; the next record reopens it
    pub fn close(&self) -> Result<()> {
        if let Some(mut file) = self.file.lock().take() {
            file.flush()?;
        }
        Ok(())
    }

    fn append(&self, bytes: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        if file.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    LoggerError::io_operation("opening hook file", self.path.display().to_string(), e)
                })?;
            *file = Some(opened);
        }

        if let Some(file) = file.as_mut() {
            file.write_all(bytes)?;
        }
        Ok(())
    }
}

impl Hook for FileWriteHook {
    fn name(&self) -> &str {
        "file_write"
    }

    fn stages(&self) -> &[Stage] {
        &[Stage::AfterWrite]
    }

    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, record: &mut Record, stage: Stage) -> HookResult {
        if stage != Stage::AfterWrite {
            return HookResult::proceed();
        }

        let written = self
            .formatter
            .format(record)
            .and_then(|bytes| self.append(&bytes));

        match written {
            Ok(()) => HookResult::proceed(),
            Err(e) => HookResult::failed(LoggerError::hook(self.name(), stage, e.to_string())),
        }
    }
}
