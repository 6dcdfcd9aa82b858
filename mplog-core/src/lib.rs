//! # mplog-core
//! Core utilities for mplog - records, handlers, rotation and the record queue
//! shared by in-process and multi-process logging.

mod config;
mod formatter;
mod handler;
mod ipc;
mod listener;
mod queue;
mod record;
mod rotation;

pub use config::{MPLOG_CONFIG, MPLogConfig};
pub use formatter::{BASIC_FORMAT, DEFAULT_FORMAT, FormatError, Formatter, PROCESS_FORMAT};
pub use handler::{FileHandler, Handler, StreamHandler};
pub use ipc::{JsonLinesSink, JsonLinesSource};
pub use listener::{Dispatch, ListenerStats, QueueListener, run_listener};
pub use queue::{
    QueueError, QueueHandler, QueueItem, QueueReceiver, QueueSender, RecordSink, RecordSource,
    record_queue,
};
pub use record::{Level, LogRecord, ParseLevelError};
pub use rotation::{RotatingFileHandler, RotationConfig};
