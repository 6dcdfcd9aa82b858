use std::{
    env, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use mplog_core::{BASIC_FORMAT, FileHandler, FormatError, Formatter, Handler, Level, StreamHandler};

use crate::{
    bridge,
    logger::{Registry, registry},
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("a log file and explicit handlers cannot be configured together")]
    ConflictingTargets,
    #[error("another logger is already installed: {0}")]
    Bridge(#[from] log::SetLoggerError),
}

/// One-shot configuration of the root logger.
///
/// Without a file or explicit handlers, records go to stderr.
#[derive(Default)]
pub struct BasicConfig {
    level: Option<Level>,
    format: Option<String>,
    filename: Option<PathBuf>,
    handlers: Vec<Arc<dyn Handler>>,
    force: bool,
}

impl BasicConfig {
    /// Sets the root logger's level.
    pub fn with_level(self, level: Level) -> Self {
        Self {
            level: Some(level),
            ..self
        }
    }
    /// Format of the handlers created by this config; explicit handlers keep their own.
    pub fn with_format(self, format: &str) -> Self {
        Self {
            format: Some(format.into()),
            ..self
        }
    }
    /// Log to this file (append mode) instead of stderr.
    pub fn with_filename<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            filename: Some(path.as_ref().to_path_buf()),
            ..self
        }
    }
    /// Attaches an explicit handler to the root logger.
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }
    /// Replace handlers already attached to the root logger.
    pub fn force(self) -> Self {
        Self {
            force: true,
            ..self
        }
    }

    /// Applies the configuration to `registry`'s root logger.
    ///
    /// Returns `Ok(false)` without touching anything if the root logger already
    /// has handlers and `force` was not requested.
    pub fn apply(self, registry: &Registry) -> Result<bool, ConfigError> {
        let Self {
            level,
            format,
            filename,
            handlers,
            force,
        } = self;
        if filename.is_some() && !handlers.is_empty() {
            return Err(ConfigError::ConflictingTargets);
        }
        let root = registry.root();
        if root.has_handlers() {
            if !force {
                return Ok(false);
            }
            for handler in root.clear_handlers() {
                handler.flush()?;
            }
        }
        let handlers = if handlers.is_empty() {
            let formatter = Formatter::new(format.as_deref().unwrap_or(BASIC_FORMAT))?;
            let handler: Arc<dyn Handler> = match filename {
                Some(path) => Arc::new(FileHandler::new(path)?.with_formatter(formatter)),
                None => Arc::new(StreamHandler::stderr().with_formatter(formatter)),
            };
            vec![handler]
        } else {
            handlers
        };
        for handler in handlers {
            root.add_handler(handler);
        }
        if let Some(level) = level {
            root.set_level(level);
        }
        Ok(true)
    }

    /// Configures the global root logger and routes the `log` macros to it.
    pub fn init(self) -> Result<bool, ConfigError> {
        let applied = self.apply(registry())?;
        bridge::install()?;
        Ok(applied)
    }
}

/// Returns a default [`BasicConfig`].
pub fn basic_config() -> BasicConfig {
    BasicConfig::default()
}

/// `<name of the running executable>.log` in the current directory.
pub fn script_log_file() -> io::Result<PathBuf> {
    let exe = env::current_exe()?;
    let stem = exe
        .file_stem()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no file name"))?;
    let mut name = stem.to_os_string();
    name.push(".log");
    Ok(env::current_dir()?.join(name))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/mplog_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_filename_gets_basic_format_and_warning_level() {
        let dir = test_dir("basic_config_file");
        let path = dir.join("default.log");
        let registry = Registry::new();
        assert!(basic_config().with_filename(&path).apply(&registry).unwrap());
        let logger = registry.get_logger("demo");
        logger.debug("this is my debugging message");
        logger.info("this is my info message");
        logger.warning("this is my warning message");
        logger.error("this is my error message");
        logger.critical("now it is too late");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "WARNING:demo:this is my warning message\n\
             ERROR:demo:this is my error message\n\
             CRITICAL:demo:now it is too late\n"
        );
    }

    #[test]
    fn test_second_call_is_a_no_op_unless_forced() {
        let dir = test_dir("basic_config_force");
        let registry = Registry::new();
        assert!(
            basic_config()
                .with_filename(dir.join("first.log"))
                .apply(&registry)
                .unwrap()
        );
        assert!(
            !basic_config()
                .with_filename(dir.join("second.log"))
                .apply(&registry)
                .unwrap()
        );
        assert!(!dir.join("second.log").exists());
        assert!(
            basic_config()
                .with_filename(dir.join("second.log"))
                .force()
                .with_level(Level::Info)
                .with_format("{levelname} {message}")
                .apply(&registry)
                .unwrap()
        );
        assert_eq!(registry.root().handlers().len(), 1);
        registry.get_logger("x").info("moved");
        assert_eq!(fs::read_to_string(dir.join("first.log")).unwrap(), "");
        assert_eq!(
            fs::read_to_string(dir.join("second.log")).unwrap(),
            "INFO moved\n"
        );
    }

    #[test]
    fn test_explicit_handlers_and_level() {
        let dir = test_dir("basic_config_handlers");
        let registry = Registry::new();
        let warnings = Arc::new(
            FileHandler::new(dir.join("warnings.log"))
                .unwrap()
                .with_level(Level::Warning),
        );
        let everything = Arc::new(FileHandler::new(dir.join("all.log")).unwrap());
        basic_config()
            .with_level(Level::Debug)
            .with_handler(warnings)
            .with_handler(everything)
            .apply(&registry)
            .unwrap();
        let logger = registry.get_logger("handlers");
        logger.debug("d");
        logger.warning("w");
        assert_eq!(
            fs::read_to_string(dir.join("all.log")).unwrap(),
            "DEBUG:handlers:d\nWARNING:handlers:w\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("warnings.log")).unwrap(),
            "WARNING:handlers:w\n"
        );
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let registry = Registry::new();
        let result = basic_config()
            .with_filename("/tmp/mplog_test_conflict.log")
            .with_handler(Arc::new(StreamHandler::stderr()))
            .apply(&registry);
        assert!(matches!(result, Err(ConfigError::ConflictingTargets)));
        let result = basic_config().with_format("{nope}").apply(&registry);
        assert!(matches!(result, Err(ConfigError::Format(_))));
        assert!(!registry.root().has_handlers());
    }

    #[test]
    fn test_script_log_file_is_named_after_the_executable() {
        let path = script_log_file().unwrap();
        let exe_stem = env::current_exe().unwrap().file_stem().unwrap().to_os_string();
        assert_eq!(path.extension().unwrap(), "log");
        assert_eq!(path.file_stem().unwrap(), exe_stem.as_os_str());
        assert_eq!(path.parent().unwrap(), env::current_dir().unwrap());
    }
}
