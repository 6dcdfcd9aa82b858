use std::{fmt, str::FromStr};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::MPLOG_CONFIG;

/// Severity of a record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "10" => Level::Debug,
            "INFO" | "20" => Level::Info,
            "WARNING" | "WARN" | "30" => Level::Warning,
            "ERROR" | "40" => Level::Error,
            "CRITICAL" | "FATAL" | "50" => Level::Critical,
            _ => return Err(ParseLevelError(s.to_string())),
        };
        Ok(level)
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}

/// A single log entry. Created once by the emitting logger, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub created: DateTime<Local>,
    pub name: String,
    pub level: Level,
    pub process: u32,
    pub process_name: String,
    pub message: String,
}

impl LogRecord {
    /// Builds a record stamped with the current time and the calling process.
    pub fn new(name: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            created: Local::now(),
            name: name.into(),
            level,
            process: std::process::id(),
            process_name: MPLOG_CONFIG.PROCESS_NAME.clone(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
        assert_eq!(Level::Warning.value(), 30);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warning));
        assert_eq!(" critical ".parse::<Level>(), Ok(Level::Critical));
        assert_eq!("40".parse::<Level>(), Ok(Level::Error));
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_log_levels_map_onto_levels() {
        assert_eq!(Level::from(log::Level::Trace), Level::Debug);
        assert_eq!(Level::from(log::Level::Warn), Level::Warning);
        assert_eq!(Level::from(log::Level::Error), Level::Error);
    }

    #[test]
    fn test_record_survives_json() {
        let record = LogRecord::new("banana", Level::Error, "peeled");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"ERROR\""));
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.process, std::process::id());
    }
}
