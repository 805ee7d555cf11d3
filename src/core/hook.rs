//! Hook trait for per-record interceptors

use super::{error::LoggerError, log_level::LogLevel, record::Record};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed points in record processing where hooks run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Right after dequeue, before the formatter
    BeforeFormat,
    /// Right after formatting
    AfterFormat,
    /// Right before the sink write
    BeforeWrite,
    /// Right after the sink write; a skip here cannot undo the write
    AfterWrite,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::BeforeFormat,
        Stage::AfterFormat,
        Stage::BeforeWrite,
        Stage::AfterWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::BeforeFormat => "before_format",
            Stage::AfterFormat => "after_format",
            Stage::BeforeWrite => "before_write",
            Stage::AfterWrite => "after_write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single hook invocation
///
/// A hook can veto the record and report an error in the same call.
#[derive(Debug, Default)]
pub struct HookResult {
    pub skip: bool,
    pub error: Option<LoggerError>,
}

impl HookResult {
    /// Continue processing
    pub fn proceed() -> Self {
        Self::default()
    }

    /// Stop the pipeline for this record
    pub fn skip() -> Self {
        Self {
            skip: true,
            error: None,
        }
    }

    /// Report an error and keep going
    pub fn failed(error: LoggerError) -> Self {
        Self {
            skip: false,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn and_skip(mut self) -> Self {
        self.skip = true;
        self
    }
}

impl From<Result<(), LoggerError>> for HookResult {
    fn from(result: Result<(), LoggerError>) -> Self {
        match result {
            Ok(()) => HookResult::proceed(),
            Err(e) => HookResult::failed(e),
        }
    }
}

pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    /// Stages this hook is bound to
    fn stages(&self) -> &[Stage];

    /// Levels this hook applies to
    fn levels(&self) -> &[LogLevel];

    fn fire(&self, record: &mut Record, stage: Stage) -> HookResult;

    fn applies_to(&self, stage: Stage, level: LogLevel) -> bool {
        self.stages().contains(&stage) && self.levels().contains(&level)
    }
}
