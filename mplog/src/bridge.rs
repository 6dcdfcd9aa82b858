use std::sync::{Mutex, PoisonError};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::logger::registry;

/// Routes `log` macros into the global registry: the record's target selects
/// the logger.
struct LogBridge;

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        registry()
            .get_logger(metadata.target())
            .is_enabled_for(metadata.level().into())
    }

    fn log(&self, record: &Record) {
        let logger = registry().get_logger(record.target());
        logger.log(record.level().into(), record.args().to_string());
    }

    fn flush(&self) {
        use mplog_core::Dispatch;
        if let Err(err) = registry().flush() {
            eprintln!("mplog: flushing handlers failed: {err}");
        }
    }
}

static INSTALLED: Mutex<bool> = Mutex::new(false);

/// Installs the bridge as the `log` crate's logger. Calling it again is a no-op.
///
/// Fails if some other logger was installed first.
pub fn install() -> Result<(), SetLoggerError> {
    let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
    if !*installed {
        log::set_boxed_logger(Box::new(LogBridge))?;
        log::set_max_level(LevelFilter::Trace);
        *installed = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use mplog_core::{Handler, Level, LogRecord};

    use super::*;
    use crate::get_logger;

    struct Capture(Mutex<Vec<(Level, String)>>);

    impl Handler for Capture {
        fn level(&self) -> Option<Level> {
            None
        }
        fn emit(&self, record: &LogRecord) -> io::Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((record.level, record.message.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_log_macros_reach_the_target_logger() {
        install().unwrap();
        install().unwrap();
        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let logger = get_logger("bridge_test");
        logger.set_level(Level::Info);
        logger.set_propagate(false);
        logger.add_handler(capture.clone());

        log::trace!(target: "bridge_test", "too quiet");
        log::debug!(target: "bridge_test", "too quiet");
        log::info!(target: "bridge_test", "hello {}", 42);
        log::warn!(target: "bridge_test", "careful");
        assert_eq!(
            *capture.0.lock().unwrap(),
            vec![
                (Level::Info, "hello 42".to_string()),
                (Level::Warning, "careful".to_string())
            ]
        );
        assert!(!log::log_enabled!(target: "bridge_test", log::Level::Debug));
        assert!(log::log_enabled!(target: "bridge_test", log::Level::Error));
    }
}
