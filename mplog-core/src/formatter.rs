use std::sync::LazyLock;

use colored::Colorize;
use regex::Regex;

use crate::record::{Level, LogRecord};

/// `LEVEL:name:message`, the layout used when nothing else is configured.
pub const BASIC_FORMAT: &str = "{levelname}:{name}:{message}";
pub const DEFAULT_FORMAT: &str = "{asctime} - {name} - {levelname} - {message}";
pub const PROCESS_FORMAT: &str = "{asctime} - {name} - {levelname} - {process} - {message}";

const ASCTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w*)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unknown format field {{{0}}}")]
    UnknownField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Asctime,
    Name,
    LevelName,
    LevelNo,
    Process,
    ProcessName,
    Message,
}

impl Field {
    fn parse(name: &str) -> Result<Self, FormatError> {
        Ok(match name {
            "asctime" => Field::Asctime,
            "name" => Field::Name,
            "levelname" => Field::LevelName,
            "levelno" => Field::LevelNo,
            "process" => Field::Process,
            "processName" => Field::ProcessName,
            "message" => Field::Message,
            other => return Err(FormatError::UnknownField(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Turns a record into one line of text following a `{field}` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    segments: Vec<Segment>,
    colored: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(BASIC_FORMAT).expect("BASIC_FORMAT is valid")
    }
}

impl Formatter {
    pub fn new(pattern: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(pattern) {
            let whole = caps.get(0).expect("group 0 always matches");
            if whole.start() > last {
                segments.push(Segment::Literal(pattern[last..whole.start()].to_string()));
            }
            segments.push(Segment::Field(Field::parse(&caps[1])?));
            last = whole.end();
        }
        if last < pattern.len() {
            segments.push(Segment::Literal(pattern[last..].to_string()));
        }
        Ok(Self {
            segments,
            colored: false,
        })
    }

    /// Colours the level name, for terminal output.
    pub fn with_color(self, colored: bool) -> Self {
        Self { colored, ..self }
    }

    pub fn format(&self, record: &LogRecord) -> String {
        let mut line = String::with_capacity(64 + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Field(field) => match field {
                    Field::Asctime => {
                        line.push_str(&record.created.format(ASCTIME_FORMAT).to_string())
                    }
                    Field::Name => line.push_str(&record.name),
                    Field::LevelName if self.colored => {
                        line.push_str(&colorize(record.level).to_string())
                    }
                    Field::LevelName => line.push_str(record.level.as_str()),
                    Field::LevelNo => line.push_str(&record.level.value().to_string()),
                    Field::Process => line.push_str(&record.process.to_string()),
                    Field::ProcessName => line.push_str(&record.process_name),
                    Field::Message => line.push_str(&record.message),
                },
            }
        }
        line
    }
}

fn colorize(level: Level) -> colored::ColoredString {
    match level {
        Level::Debug => "DEBUG".blue(),
        Level::Info => "INFO".green(),
        Level::Warning => "WARNING".yellow(),
        Level::Error => "ERROR".red(),
        Level::Critical => "CRITICAL".purple(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;

    fn record() -> LogRecord {
        LogRecord {
            created: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            name: "superman".into(),
            level: Level::Warning,
            process: 4242,
            process_name: "Process-3".into(),
            message: "up, up and away".into(),
        }
    }

    #[test]
    fn test_basic_format() {
        let line = Formatter::default().format(&record());
        assert_eq!(line, "WARNING:superman:up, up and away");
    }

    #[test]
    fn test_process_format() {
        let line = Formatter::new(PROCESS_FORMAT).unwrap().format(&record());
        assert_eq!(
            line,
            "2024-03-09 14:05:07,000 - superman - WARNING - 4242 - up, up and away"
        );
    }

    #[test]
    fn test_all_fields() {
        let formatter = Formatter::new("[{levelno}] {processName}/{process} {name}: {message}!")
            .unwrap();
        assert_eq!(
            formatter.format(&record()),
            "[30] Process-3/4242 superman: up, up and away!"
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert_eq!(
            Formatter::new("{asctime} {thread}"),
            Err(FormatError::UnknownField("thread".into()))
        );
        assert_eq!(
            Formatter::new("{} {message}"),
            Err(FormatError::UnknownField(String::new()))
        );
    }

    #[test]
    fn test_literal_only_pattern() {
        assert_eq!(Formatter::new("static").unwrap().format(&record()), "static");
    }
}
