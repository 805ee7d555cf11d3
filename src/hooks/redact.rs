//! Message redaction hook

use crate::core::{Hook, HookResult, LogLevel, LoggerError, Record, Result, Stage};
use regex::Regex;

/// Mainland China mobile numbers: `1`, a digit 3-9, nine more digits
pub const PHONE_PATTERN: &str = r"1[3-9]\d{9}";

/// Masks sensitive substrings of the message before it is formatted
///
/// Each match keeps its first three characters and everything from the
/// eighth on; the four in between become `****`. Matches shorter than seven
/// characters are left alone.
///
/// ```
/// use dispatch_logger::hooks::RedactHook;
///
/// let hook = RedactHook::new().expect("phone pattern compiles");
/// assert_eq!(hook.redact("call 13812345678"), "call 138****5678");
/// ```
#[derive(Debug, Clone)]
pub struct RedactHook {
    pattern: Regex,
}

impl RedactHook {
    /// Redact phone numbers
    pub fn new() -> Result<Self> {
        Self::with_pattern(PHONE_PATTERN)
    }

    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| LoggerError::config("redact pattern", e.to_string()))?;
        Ok(Self { pattern })
    }

    pub fn redact(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures<'_>| mask(&caps[0]))
            .into_owned()
    }
}

fn mask(matched: &str) -> String {
    let chars: Vec<char> = matched.chars().collect();
    if chars.len() < 7 {
        return matched.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[7..].iter().collect();
    format!("{}****{}", head, tail)
}

impl Hook for RedactHook {
    fn name(&self) -> &str {
        "redact"
    }

    fn stages(&self) -> &[Stage] {
        &[Stage::BeforeFormat]
    }

    fn levels(&self) -> &[LogLevel] {
        &LogLevel::ALL
    }

    fn fire(&self, record: &mut Record, _stage: Stage) -> HookResult {
        if self.pattern.is_match(&record.message) {
            record.message = self.redact(&record.message);
        }
        HookResult::proceed()
    }
}
