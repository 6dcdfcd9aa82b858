use std::io;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use serde::{Deserialize, Serialize};

use crate::{
    handler::Handler,
    record::{Level, LogRecord},
};

/// What travels through a record queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueItem {
    Record(LogRecord),
    /// Tells the consumer that no more records will follow.
    Sentinel,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("undecodable queue item {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("queue closed before the sentinel was received")]
    Disconnected,
}

/// Producer side of a record queue.
pub trait RecordSink: Send + Sync {
    fn put(&self, item: QueueItem) -> Result<(), QueueError>;
}

/// Consumer side of a record queue. `get` blocks until an item is available.
pub trait RecordSource {
    fn get(&mut self) -> Result<QueueItem, QueueError>;
}

/// Cloneable producer handle of an in-process queue.
#[derive(Debug, Clone)]
pub struct QueueSender {
    sender: Sender<QueueItem>,
}

#[derive(Debug)]
pub struct QueueReceiver {
    receiver: Receiver<QueueItem>,
}

/// Creates a multi-producer, single-consumer FIFO of queue items.
///
/// With a capacity, producers block while the queue is full.
pub fn record_queue(capacity: Option<usize>) -> (QueueSender, QueueReceiver) {
    let (sender, receiver) = match capacity {
        Some(capacity) => bounded(capacity),
        None => unbounded(),
    };
    (QueueSender { sender }, QueueReceiver { receiver })
}

impl QueueSender {
    /// Enqueues the sentinel that stops the consumer.
    pub fn close(&self) -> Result<(), QueueError> {
        self.put(QueueItem::Sentinel)
    }
}

impl RecordSink for QueueSender {
    fn put(&self, item: QueueItem) -> Result<(), QueueError> {
        self.sender.send(item).map_err(|_| QueueError::Disconnected)
    }
}

impl RecordSource for QueueReceiver {
    fn get(&mut self) -> Result<QueueItem, QueueError> {
        self.receiver.recv().map_err(|_| QueueError::Disconnected)
    }
}

impl QueueReceiver {
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Forwards every record it handles into a queue instead of writing it anywhere.
pub struct QueueHandler<S> {
    sink: S,
    level: Option<Level>,
}

impl<S: RecordSink> QueueHandler<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, level: None }
    }

    pub fn with_level(self, level: Level) -> Self {
        Self {
            level: Some(level),
            ..self
        }
    }
}

impl<S: RecordSink> Handler for QueueHandler<S> {
    fn level(&self) -> Option<Level> {
        self.level
    }

    fn emit(&self, record: &LogRecord) -> io::Result<()> {
        self.sink
            .put(QueueItem::Record(record.clone()))
            .map_err(|err| match err {
                QueueError::Io(err) => err,
                other => io::Error::new(io::ErrorKind::BrokenPipe, other),
            })
    }
}
