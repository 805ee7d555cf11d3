//! Built-in hooks

pub mod file_write;
pub mod redact;

pub use file_write::FileWriteHook;
pub use redact::{RedactHook, PHONE_PATTERN};
