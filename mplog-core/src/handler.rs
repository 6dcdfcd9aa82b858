use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    formatter::Formatter,
    record::{Level, LogRecord},
};

/// A sink that accepts records and performs the actual output.
///
/// Handlers are shared between loggers and threads, so every implementation
/// serializes its own writes.
pub trait Handler: Send + Sync {
    /// Minimum level this handler accepts. `None` accepts everything.
    fn level(&self) -> Option<Level>;

    fn emit(&self, record: &LogRecord) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn handle(&self, record: &LogRecord) -> io::Result<()> {
        match self.level() {
            Some(level) if record.level < level => Ok(()),
            _ => self.emit(record),
        }
    }
}

/// A record that panicked mid-write must not take the sink down with it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn open_append(path: &Path) -> io::Result<File> {
    File::options().create(true).append(true).open(path)
}

/// Writes formatted records to a stream, stderr unless told otherwise.
pub struct StreamHandler {
    stream: Mutex<Box<dyn Write + Send>>,
    formatter: Formatter,
    level: Option<Level>,
}

impl Default for StreamHandler {
    fn default() -> Self {
        Self::stderr()
    }
}

impl StreamHandler {
    pub fn new<W: Write + Send + 'static>(stream: W) -> Self {
        Self {
            stream: Mutex::new(Box::new(stream)),
            formatter: Formatter::default(),
            level: None,
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
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
}

impl Handler for StreamHandler {
    fn level(&self) -> Option<Level> {
        self.level
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = self.formatter.format(record);
        let mut stream = lock(&self.stream);
        writeln!(stream, "{line}")?;
        stream.flush()
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.stream).flush()
    }
}

/// Appends formatted records to a file, creating it if needed.
pub struct FileHandler {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
    formatter: Formatter,
    level: Option<Level>,
}

impl FileHandler {
    pub fn new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(BufWriter::new(file)),
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
}

impl Handler for FileHandler {
    fn level(&self) -> Option<Level> {
        self.level
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = self.formatter.format(record);
        let mut file = lock(&self.file);
        writeln!(file, "{line}")?;
        file.flush()
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.file).flush()
    }
}
