//! Ordered, stage-gated hook execution

use super::{
    error::{panic_message, LoggerError},
    hook::{Hook, Stage},
    record::Record,
};
use std::sync::Arc;

/// Result of running one stage over a record
#[derive(Debug, Default)]
pub struct StageOutcome {
    /// A hook vetoed the record; the rest of the pipeline must not run
    pub skipped: bool,
    pub errors: Vec<LoggerError>,
}

/// Registered hooks in registration order
///
/// The logger keeps the pipeline behind an `Arc` and replaces it on
/// registration, so consumers run a snapshot without holding any lock.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Copy of this pipeline with `hook` appended
    #[must_use]
    pub fn with_hook(&self, hook: Arc<dyn Hook>) -> Self {
        let mut hooks = self.hooks.clone();
        hooks.push(hook);
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook bound to `stage` and the record's level
    ///
    /// Errors are collected without stopping iteration. The first skip ends
    /// the stage immediately. A panicking hook is reported as an error.
    pub fn run(&self, stage: Stage, record: &mut Record) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        let level = record.level;

        for hook in self.hooks.iter().filter(|h| h.applies_to(stage, level)) {
            let fired = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                hook.fire(record, stage)
            }));

            match fired {
                Ok(result) => {
                    if let Some(err) = result.error {
                        outcome.errors.push(err);
                    }
                    if result.skip {
                        outcome.skipped = true;
                        return outcome;
                    }
                }
                Err(panic_info) => {
                    outcome.errors.push(LoggerError::HookPanicked {
                        hook: hook.name().to_string(),
                        stage,
                        message: panic_message(panic_info.as_ref()),
                    });
                }
            }
        }

        outcome
    }
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}
