//! Record formatters
//!
//! A formatter turns a [`Record`] into the exact bytes handed to sinks. It
//! must be pure: no I/O, no mutation, and the same output for the same record
//! and configuration.
//!
//! - [`TextFormatter`]: `{2025-01-08 10:30:45.123} [INFO] (api) - message | k=v`
//! - [`JsonFormatter`]: one JSON object per line

use super::{error::Result, log_level::LogLevel, record::Record, timestamp::TimestampFormat};
use colored::Color;
use std::path::Path;

pub trait Formatter: Send + Sync {
    fn format(&self, record: &Record) -> Result<Vec<u8>>;
    fn name(&self) -> &str;
}

/// Immutable level → colour table owned by a formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPalette {
    levels: [Color; 7],
    timestamp: Color,
    origin: Color,
    message: Color,
}

impl LevelPalette {
    pub const DEFAULT: LevelPalette = LevelPalette {
        levels: [
            Color::BrightBlack,
            Color::Cyan,
            Color::Green,
            Color::Yellow,
            Color::Red,
            Color::Magenta,
            Color::BrightRed,
        ],
        timestamp: Color::BrightBlack,
        origin: Color::Cyan,
        message: Color::White,
    };

    #[must_use]
    pub fn with_level(mut self, level: LogLevel, color: Color) -> Self {
        self.levels[level as usize] = color;
        self
    }

    pub fn level(&self, level: LogLevel) -> Color {
        self.levels[level as usize]
    }

    /// Wrap `text` in ANSI escapes independent of terminal detection
    fn paint(color: Color, text: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), text)
    }
}

impl Default for LevelPalette {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Human-readable single-line formatter
#[derive(Debug, Clone)]
pub struct TextFormatter {
    enable_color: bool,
    show_caller: bool,
    timestamp_format: TimestampFormat,
    palette: LevelPalette,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self {
            enable_color: true,
            show_caller: false,
            timestamp_format: TimestampFormat::default(),
            palette: LevelPalette::DEFAULT,
        }
    }

    #[must_use]
    pub fn with_colors(mut self, enable: bool) -> Self {
        self.enable_color = enable;
        self
    }

    #[must_use]
    pub fn with_caller(mut self, show: bool) -> Self {
        self.show_caller = show;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_palette(mut self, palette: LevelPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn shows_caller(&self) -> bool {
        self.show_caller
    }

    fn colorize(&self, color: Color, text: &str) -> String {
        if self.enable_color {
            LevelPalette::paint(color, text)
        } else {
            text.to_string()
        }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TextFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>> {
        let mut buf = String::with_capacity(256);

        buf.push('{');
        buf.push_str(&self.colorize(
            self.palette.timestamp,
            &self.timestamp_format.try_format(&record.timestamp)?,
        ));
        buf.push_str("} [");
        buf.push_str(&self.colorize(self.palette.level(record.level), record.level.to_str()));
        buf.push_str("] (");
        buf.push_str(&self.colorize(self.palette.origin, &record.origin));
        buf.push(')');

        if self.show_caller && record.skip >= 0 {
            if let Some(location) = record.caller {
                let file = Path::new(location.file())
                    .file_name()
                    .and_then(|f| f.to_str())
                    .unwrap_or("unknown");
                buf.push_str(&format!(" [{}:{}]", file, location.line()));
            }
        }

        buf.push_str(" - ");
        buf.push_str(&self.colorize(self.palette.message, &record.message));

        if !record.fields.is_empty() {
            buf.push_str(" | ");
            buf.push_str(&record.fields.format_fields());
        }

        buf.push('\n');
        Ok(buf.into_bytes())
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// JSON-lines formatter for machine processing
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
    show_caller: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            timestamp_format: TimestampFormat::Iso8601,
            show_caller: false,
        }
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_caller(mut self, show: bool) -> Self {
        self.show_caller = show;
        self
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record) -> Result<Vec<u8>> {
        let mut json_obj = serde_json::Map::new();

        let timestamp = if self.timestamp_format.is_numeric() {
            serde_json::Value::Number(record.timestamp.timestamp_millis().into())
        } else {
            serde_json::Value::String(self.timestamp_format.try_format(&record.timestamp)?)
        };
        json_obj.insert("time".to_string(), timestamp);
        json_obj.insert(
            "level".to_string(),
            serde_json::Value::String(record.level.to_str().to_string()),
        );
        json_obj.insert(
            "origin".to_string(),
            serde_json::Value::String(record.origin.to_string()),
        );
        json_obj.insert(
            "message".to_string(),
            serde_json::Value::String(record.message.clone()),
        );

        if self.show_caller && record.skip >= 0 {
            if let Some(location) = record.caller {
                json_obj.insert(
                    "caller".to_string(),
                    serde_json::Value::String(format!("{}:{}", location.file(), location.line())),
                );
            }
        }

        if !record.fields.is_empty() {
            let fields: serde_json::Map<String, serde_json::Value> = record
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_value()))
                .collect();
            json_obj.insert("fields".to_string(), serde_json::Value::Object(fields));
        }

        let mut bytes = serde_json::to_vec(&serde_json::Value::Object(json_obj))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn name(&self) -> &str {
        "json"
    }
}
