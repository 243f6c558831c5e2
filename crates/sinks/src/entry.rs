//! Structured log entries
//!
//! A `LogEntry` is produced by whatever logging front-end embeds the sink and
//! is immutable once handed over. Its JSON form is the journal record:
//!
//! ```json
//! {"timestamp":"2025-01-01T12:00:00Z","level":"info","message":"started","fields":{"port":8080}}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Lowercase name, as stored in the journal and the columnar `level` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar value attached to an entry
///
/// Untagged: the journal stores plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// The string payload, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One structured log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Key-ordered scalar fields
    pub fields: BTreeMap<String, FieldValue>,
}

impl LogEntry {
    /// Create an entry stamped with the current time and no fields
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach a field, replacing any previous value under the same key
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
    }

    #[test]
    fn test_level_names() {
        for (level, name) in [
            (Level::Debug, "debug"),
            (Level::Info, "info"),
            (Level::Warn, "warn"),
            (Level::Error, "error"),
            (Level::Fatal, "fatal"),
        ] {
            assert_eq!(level.as_str(), name);
            assert_eq!(level.to_string(), name);
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", name));
        }
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(serde_json::from_str::<Level>("\"verbose\"").is_err());
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = LogEntry::new(Level::Warn, "disk nearly full")
            .at(fixed_time())
            .with_field("mount", "/var")
            .with_field("percent", 93);

        let value: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["timestamp"], "2025-03-14T15:09:26Z");
        assert_eq!(value["level"], "warn");
        assert_eq!(value["message"], "disk nearly full");
        assert_eq!(value["fields"]["mount"], "/var");
        assert_eq!(value["fields"]["percent"], 93);
    }

    #[test]
    fn test_field_values_keep_their_type() {
        let json = r#"{"timestamp":"2025-03-14T15:09:26+02:00","level":"info","message":"m",
            "fields":{"a":"x","b":-3,"c":18446744073709551615,"d":1.5,"e":true,"f":null}}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2025, 3, 14, 13, 9, 26).unwrap());
        assert_eq!(entry.fields["a"], FieldValue::String("x".into()));
        assert_eq!(entry.fields["b"], FieldValue::Int(-3));
        assert_eq!(entry.fields["c"], FieldValue::UInt(u64::MAX));
        assert_eq!(entry.fields["d"], FieldValue::Float(1.5));
        assert_eq!(entry.fields["e"], FieldValue::Bool(true));
        assert_eq!(entry.fields["f"], FieldValue::Null);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let json = r#"{"timestamp":"2025-03-14T15:09:26Z","level":"info","message":"m"}"#;
        assert!(serde_json::from_str::<LogEntry>(json).is_err());
    }

    #[test]
    fn test_nested_field_value_rejected() {
        let json = r#"{"timestamp":"2025-03-14T15:09:26Z","level":"info","message":"m",
            "fields":{"nested":{"a":1}}}"#;
        assert!(serde_json::from_str::<LogEntry>(json).is_err());
    }

    #[test]
    fn test_with_field_replaces() {
        let entry = LogEntry::new(Level::Info, "m")
            .with_field("k", "one")
            .with_field("k", "two");
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(entry.fields["k"].as_str(), Some("two"));
    }
}
