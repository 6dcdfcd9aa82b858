use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{
    formatter::Formatter,
    handler::{Handler, lock, open_append},
    record::{Level, LogRecord},
};

/// Size-based rotation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationConfig {
    /// Roll over before a write that would bring the active file to this size.
    pub max_bytes: u64,
    /// Number of numbered backups kept next to the active file.
    pub backup_count: u32,
}

impl RotationConfig {
    fn enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

struct ActiveFile {
    file: BufWriter<File>,
    size: u64,
}

/// A file handler that rotates the active file into `<file>.1 .. <file>.N`.
///
/// `<file>.1` is always the most recent backup. When rotation is disabled
/// (`max_bytes == 0` or `backup_count == 0`) this behaves like a plain
/// append-mode file handler.
pub struct RotatingFileHandler {
    path: PathBuf,
    config: RotationConfig,
    active: Mutex<ActiveFile>,
    formatter: Formatter,
    level: Option<Level>,
}

impl RotatingFileHandler {
    pub fn new<P: AsRef<Path>>(path: P, config: RotationConfig) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let active = open_active(&path)?;
        Ok(Self {
            path,
            config,
            active: Mutex::new(active),
            formatter: Formatter::default(),
            level: None,
        })
    }

    pub fn with_formatter(self, formatter: Formatter) -> Self {
        Self { formatter, ..self }
    }

    pub fn with_level(self, level: Level) -> Self {
        Self {
            level: Some(level),
            ..self
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> RotationConfig {
        self.config
    }

    /// Path of the `index`-th backup, `<file>.<index>`.
    pub fn backup_path(&self, index: u32) -> PathBuf {
        backup_path(&self.path, index)
    }

    fn should_rollover(&self, active: &ActiveFile, incoming: u64) -> bool {
        self.config.enabled() && active.size > 0 && active.size + incoming >= self.config.max_bytes
    }

    fn rollover(&self, active: &mut ActiveFile) -> io::Result<()> {
        active.file.flush()?;
        let oldest = self.backup_path(self.config.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.config.backup_count).rev() {
            let source = self.backup_path(index);
            if source.exists() {
                fs::rename(&source, self.backup_path(index + 1))?;
            }
        }
        // the active file may have been removed behind our back
        if self.path.exists() {
            fs::rename(&self.path, self.backup_path(1))?;
        }
        *active = open_active(&self.path)?;
        Ok(())
    }
}

impl Handler for RotatingFileHandler {
    fn level(&self) -> Option<Level> {
        self.level
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let mut line = self.formatter.format(record);
        line.push('\n');
        let mut active = lock(&self.active);
        if self.should_rollover(&active, line.len() as u64) {
            self.rollover(&mut active)?;
        }
        active.file.write_all(line.as_bytes())?;
        active.file.flush()?;
        active.size += line.len() as u64;
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.active).file.flush()
    }
}

fn open_active(path: &Path) -> io::Result<ActiveFile> {
    let file = open_append(path)?;
    let size = file.metadata()?.len();
    Ok(ActiveFile {
        file: BufWriter::new(file),
        size,
    })
}

fn backup_path(path: &Path, index: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
