//! # mplog
//! Named loggers, one-call configuration and multi-process queue logging.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! mplog = "0.1.0"
//! ```
//!
//! ```rust
//! use mplog::{Level, basic_config, get_logger};
//!
//! basic_config()
//!     .with_level(Level::Info)
//!     .with_filename("/tmp/mplog_doc_basic.log")
//!     .init()
//!     .expect("Unable to configure logging");
//!
//! let logger = get_logger("app");
//! logger.debug("dropped, below the root level");
//! logger.warning("written");
//! log::info!(target: "app", "the log macros work too");
//! ```
//!
//! ## Handlers
//! Handlers do the actual output and each carry their own threshold and format.
//!
//! ```rust
//! use std::sync::Arc;
//! use mplog::{DEFAULT_FORMAT, FileHandler, Formatter, Level, StreamHandler, basic_config};
//!
//! let format = Formatter::new(DEFAULT_FORMAT).unwrap();
//! let file = FileHandler::new("/tmp/mplog_doc_handlers.log")
//!     .expect("Unable to create log file")
//!     .with_level(Level::Warning)
//!     .with_formatter(format.clone());
//! let console = StreamHandler::stderr().with_formatter(format.with_color(true));
//! basic_config()
//!     .with_level(Level::Debug)
//!     .with_handler(Arc::new(file))
//!     .with_handler(Arc::new(console))
//!     .init()
//!     .unwrap();
//! mplog::get_logger("handlers").error("to the console and the file");
//! ```
//!
//! ## Rotating log files
//! ```rust
//! use std::sync::Arc;
//! use mplog::{RotatingFileHandler, RotationConfig, get_logger};
//!
//! let _ = std::fs::remove_file("/tmp/mplog_doc_rotation.log");
//! let handler = RotatingFileHandler::new(
//!     "/tmp/mplog_doc_rotation.log",
//!     RotationConfig { max_bytes: 300, backup_count: 10 },
//! )
//! .unwrap();
//! let logger = get_logger("rotating");
//! logger.add_handler(Arc::new(handler));
//! for i in 0..100 {
//!     logger.warning(format!("Hello, World! (count: {i:3})"));
//! }
//! assert!(std::path::Path::new("/tmp/mplog_doc_rotation.log.1").exists());
//! ```
//!
//! ## Several processes, one file
//! See [`process`] for the listener/worker setup.

mod bridge;
mod config;
mod logger;
pub mod process;

pub use bridge::install as install_log_bridge;
pub use config::{BasicConfig, ConfigError, basic_config, script_log_file};
pub use logger::{Logger, Registry, get_logger, registry, root_logger};
pub use mplog_core::{
    BASIC_FORMAT, DEFAULT_FORMAT, Dispatch, FileHandler, FormatError, Formatter, Handler,
    JsonLinesSink, JsonLinesSource, Level, ListenerStats, LogRecord, MPLOG_CONFIG, MPLogConfig,
    PROCESS_FORMAT, QueueError, QueueHandler, QueueItem, QueueListener, QueueReceiver,
    QueueSender, RecordSink, RecordSource, RotatingFileHandler, RotationConfig, StreamHandler,
    record_queue, run_listener,
};
