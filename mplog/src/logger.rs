use std::{
    collections::HashMap,
    io,
    sync::{
        Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use mplog_core::{Dispatch, Formatter, Handler, Level, LogRecord, StreamHandler};

/// Used when a record finds no handler anywhere in its logger's ancestry.
static LAST_RESORT: LazyLock<StreamHandler> = LazyLock::new(|| {
    StreamHandler::stderr()
        .with_level(Level::Warning)
        .with_formatter(Formatter::new("{message}").expect("message-only format is valid"))
});

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// A named source of records.
///
/// Loggers form a tree through their dotted names (`app.db` is a child of
/// `app`, which is a child of the root logger). A logger without its own level
/// uses the level of its nearest ancestor, and records are passed to the
/// handlers of every ancestor as long as `propagate` is set.
pub struct Logger {
    name: String,
    parent: Option<Arc<Logger>>,
    level: RwLock<Option<Level>>,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    propagate: AtomicBool,
}

impl Logger {
    fn new(name: &str, parent: Option<Arc<Logger>>, level: Option<Level>) -> Self {
        Self {
            name: name.into(),
            parent,
            level: RwLock::new(level),
            handlers: RwLock::new(Vec::new()),
            propagate: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Logger>> {
        self.parent.as_ref()
    }

    /// The level set on this logger, if any.
    pub fn level(&self) -> Option<Level> {
        *read(&self.level)
    }

    pub fn set_level(&self, level: Level) {
        *write(&self.level) = Some(level);
    }

    /// Makes this logger inherit its level again. The root logger keeps its level.
    pub fn clear_level(&self) {
        if self.parent.is_some() {
            *write(&self.level) = None;
        }
    }

    pub fn effective_level(&self) -> Level {
        let mut logger = Some(self);
        while let Some(current) = logger {
            if let Some(level) = current.level() {
                return level;
            }
            logger = current.parent.as_deref();
        }
        Level::Warning
    }

    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.effective_level()
    }

    pub fn propagate(&self) -> bool {
        self.propagate.load(Ordering::Relaxed)
    }

    pub fn set_propagate(&self, propagate: bool) {
        self.propagate.store(propagate, Ordering::Relaxed);
    }

    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        write(&self.handlers).push(handler);
    }

    /// Detaches and returns every handler of this logger.
    pub fn clear_handlers(&self) -> Vec<Arc<dyn Handler>> {
        std::mem::take(&mut *write(&self.handlers))
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        read(&self.handlers).clone()
    }

    pub fn has_handlers(&self) -> bool {
        !read(&self.handlers).is_empty()
    }

    /// Passes a record to the handlers of this logger and its ancestors.
    ///
    /// The logger's own level is not consulted, only each handler's threshold.
    /// Every handler sees the record even if an earlier one failed; the first
    /// failure is returned.
    pub fn handle(&self, record: &LogRecord) -> io::Result<()> {
        let mut found = false;
        let mut first_error = None;
        let mut logger = Some(self);
        while let Some(current) = logger {
            for handler in read(&current.handlers).iter() {
                found = true;
                if let Err(err) = handler.handle(record) {
                    first_error.get_or_insert(err);
                }
            }
            logger = if current.propagate() {
                current.parent.as_deref()
            } else {
                None
            };
        }
        if !found {
            LAST_RESORT.handle(record)?;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Emits `message` at `level` if this logger is enabled for it.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.is_enabled_for(level) {
            return;
        }
        let record = LogRecord::new(self.name.as_str(), level, message);
        if let Err(err) = self.handle(&record) {
            eprintln!("mplog: logging error in {:?}: {err}", self.name);
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(Level::Critical, message)
    }
}

/// Owns every logger by name. One global instance backs [`get_logger`].
pub struct Registry {
    root: Arc<Logger>,
    loggers: RwLock<HashMap<String, Arc<Logger>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            root: Arc::new(Logger::new("root", None, Some(Level::Warning))),
            loggers: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Arc<Logger> {
        Arc::clone(&self.root)
    }

    /// Returns the logger called `name`, creating it and its ancestors on first use.
    ///
    /// `""` and `"root"` name the root logger.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        if name.is_empty() || name == "root" {
            return self.root();
        }
        if let Some(logger) = read(&self.loggers).get(name) {
            return Arc::clone(logger);
        }
        let parent = match name.rsplit_once('.') {
            Some((prefix, _)) if !prefix.is_empty() => self.get_logger(prefix),
            _ => self.root(),
        };
        let mut loggers = write(&self.loggers);
        let logger = loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Logger::new(name, Some(parent), None)));
        Arc::clone(logger)
    }

    fn all_loggers(&self) -> Vec<Arc<Logger>> {
        let mut loggers: Vec<_> = read(&self.loggers).values().cloned().collect();
        loggers.push(self.root());
        loggers
    }
}

impl Dispatch for Registry {
    fn dispatch(&self, record: &LogRecord) -> io::Result<()> {
        self.get_logger(&record.name).handle(record)
    }

    fn flush(&self) -> io::Result<()> {
        for logger in self.all_loggers() {
            for handler in logger.handlers() {
                handler.flush()?;
            }
        }
        Ok(())
    }
}

/// The process-wide registry.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

pub fn get_logger(name: &str) -> Arc<Logger> {
    REGISTRY.get_logger(name)
}

pub fn root_logger() -> Arc<Logger> {
    REGISTRY.root()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Capture {
        level: Option<Level>,
        lines: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Handler for Capture {
        fn level(&self) -> Option<Level> {
            self.level
        }
        fn emit(&self, record: &LogRecord) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::other("disk on fire"));
            }
            self.lines
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", record.level, record.name, record.message));
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_same_name_same_logger() {
        let registry = Registry::new();
        let a = registry.get_logger("app.db");
        let b = registry.get_logger("app.db");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&registry.get_logger(""), &registry.root()));
        assert!(Arc::ptr_eq(&registry.get_logger("root"), &registry.root()));
    }

    #[test]
    fn test_dotted_names_build_a_tree() {
        let registry = Registry::new();
        let child = registry.get_logger("app.db.pool");
        let parent = child.parent().unwrap();
        assert_eq!(parent.name(), "app.db");
        assert_eq!(parent.parent().unwrap().name(), "app");
        assert!(Arc::ptr_eq(parent.parent().unwrap().parent().unwrap(), &registry.root()));
    }

    #[test]
    fn test_effective_level_is_inherited() {
        let registry = Registry::new();
        let child = registry.get_logger("app.db");
        assert_eq!(child.effective_level(), Level::Warning);
        registry.get_logger("app").set_level(Level::Debug);
        assert_eq!(child.effective_level(), Level::Debug);
        child.set_level(Level::Error);
        assert!(!child.is_enabled_for(Level::Warning));
        child.clear_level();
        assert!(child.is_enabled_for(Level::Debug));
        registry.root().clear_level();
        assert_eq!(registry.root().level(), Some(Level::Warning));
    }

    #[test]
    fn test_records_propagate_to_ancestors() {
        let registry = Registry::new();
        let root_capture = Arc::new(Capture::default());
        let app_capture = Arc::new(Capture::default());
        registry.root().add_handler(root_capture.clone());
        registry.get_logger("app").add_handler(app_capture.clone());
        let db = registry.get_logger("app.db");
        db.error("connection lost");
        assert_eq!(app_capture.lines(), vec!["ERROR:app.db:connection lost"]);
        assert_eq!(root_capture.lines(), vec!["ERROR:app.db:connection lost"]);

        registry.get_logger("app").set_propagate(false);
        db.critical("gone");
        assert_eq!(app_capture.lines().len(), 2);
        assert_eq!(root_capture.lines().len(), 1);
    }

    #[test]
    fn test_logger_level_filters_before_handlers() {
        let registry = Registry::new();
        let capture = Arc::new(Capture::default());
        registry.root().add_handler(capture.clone());
        let logger = registry.get_logger("quiet");
        logger.debug("hidden");
        logger.info("hidden");
        logger.warning("shown");
        assert_eq!(capture.lines(), vec!["WARNING:quiet:shown"]);
    }

    #[test]
    fn test_handle_bypasses_logger_level() {
        let registry = Registry::new();
        let capture = Arc::new(Capture::default());
        let logger = registry.get_logger("strict");
        logger.set_level(Level::Critical);
        logger.add_handler(capture.clone());
        logger
            .handle(&LogRecord::new("strict", Level::Debug, "pre-filtered"))
            .unwrap();
        assert_eq!(capture.lines(), vec!["DEBUG:strict:pre-filtered"]);
    }

    #[test]
    fn test_handler_thresholds_apply() {
        let registry = Registry::new();
        let all = Arc::new(Capture::default());
        let warnings = Arc::new(Capture {
            level: Some(Level::Warning),
            ..Default::default()
        });
        let root = registry.root();
        root.set_level(Level::Debug);
        root.add_handler(all.clone());
        root.add_handler(warnings.clone());
        let logger = registry.get_logger("mixed");
        logger.debug("d");
        logger.info("i");
        logger.warning("w");
        logger.error("e");
        logger.critical("c");
        assert_eq!(all.lines().len(), 5);
        assert_eq!(
            warnings.lines(),
            vec!["WARNING:mixed:w", "ERROR:mixed:e", "CRITICAL:mixed:c"]
        );
    }

    #[test]
    fn test_failing_handler_does_not_starve_the_others() {
        let registry = Registry::new();
        let broken = Arc::new(Capture {
            fail: true,
            ..Default::default()
        });
        let capture = Arc::new(Capture::default());
        let logger = registry.get_logger("fragile");
        logger.add_handler(broken);
        logger.add_handler(capture.clone());
        let result = logger.handle(&LogRecord::new("fragile", Level::Error, "still here"));
        assert!(result.is_err());
        assert_eq!(capture.lines(), vec!["ERROR:fragile:still here"]);
    }

    #[test]
    fn test_registry_dispatches_by_record_name() {
        let registry = Registry::new();
        let banana = Arc::new(Capture::default());
        let superman = Arc::new(Capture::default());
        registry.get_logger("banana").add_handler(banana.clone());
        registry.get_logger("superman").add_handler(superman.clone());
        registry
            .dispatch(&LogRecord::new("banana", Level::Debug, "ripe"))
            .unwrap();
        registry
            .dispatch(&LogRecord::new("superman", Level::Info, "flying"))
            .unwrap();
        assert_eq!(banana.lines(), vec!["DEBUG:banana:ripe"]);
        assert_eq!(superman.lines(), vec!["INFO:superman:flying"]);
    }

    #[test]
    fn test_clear_handlers_detaches() {
        let registry = Registry::new();
        let root = registry.root();
        root.add_handler(Arc::new(Capture::default()));
        assert!(root.has_handlers());
        assert_eq!(root.clear_handlers().len(), 1);
        assert!(!root.has_handlers());
    }
}
