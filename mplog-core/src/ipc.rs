//! Queue endpoints over byte streams, used to carry records between processes.
//!
//! Each item is one line of JSON. A producer owns the write end of a pipe,
//! the consumer reads the other end in order.

use std::{
    io::{BufRead, Write},
    sync::Mutex,
};

use crate::{
    handler::lock,
    queue::{QueueError, QueueItem, RecordSink, RecordSource},
};

pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn put(&self, item: QueueItem) -> Result<(), QueueError> {
        let mut line = serde_json::to_string(&item).map_err(std::io::Error::from)?;
        line.push('\n');
        let mut writer = lock(&self.writer);
        // one write per item so concurrent producers never interleave lines
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> RecordSource for JsonLinesSource<R> {
    fn get(&mut self) -> Result<QueueItem, QueueError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Err(QueueError::Disconnected);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return serde_json::from_str(line).map_err(|source| QueueError::Decode {
                line: line.to_string(),
                source,
            });
        }
    }
}
