use std::{
    any::Any,
    io,
    ops::Deref,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use crate::{
    handler::{Handler, lock},
    queue::{QueueError, QueueItem, QueueReceiver, QueueSender, RecordSink, RecordSource},
    record::LogRecord,
};

/// Routes a dequeued record to the handlers that perform real output.
///
/// Dispatch never filters on level: the record already carries the level it
/// was emitted with.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, record: &LogRecord) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Dispatch for [Arc<dyn Handler>] {
    fn dispatch(&self, record: &LogRecord) -> io::Result<()> {
        let mut first_error = None;
        for handler in self {
            if let Err(err) = handler.handle(record) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn flush(&self) -> io::Result<()> {
        for handler in self {
            handler.flush()?;
        }
        Ok(())
    }
}

impl Dispatch for Vec<Arc<dyn Handler>> {
    fn dispatch(&self, record: &LogRecord) -> io::Result<()> {
        self.as_slice().dispatch(record)
    }

    fn flush(&self) -> io::Result<()> {
        self.as_slice().flush()
    }
}

impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    fn dispatch(&self, record: &LogRecord) -> io::Result<()> {
        (**self).dispatch(record)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Outcome of a listener run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Records dispatched without error.
    pub handled: usize,
    /// Records or queue items that could not be handled.
    pub failed: usize,
}

/// Consumes the source until the sentinel arrives.
///
/// Items are handled in arrival order, each record exactly once. A failure
/// while handling one item is reported on stderr and the loop moves on to the
/// next item. Only a closed or broken source stops the loop early.
pub fn run_listener<S, D>(source: &mut S, dispatch: &D) -> Result<ListenerStats, QueueError>
where
    S: RecordSource + ?Sized,
    D: Dispatch + ?Sized,
{
    let mut stats = ListenerStats::default();
    let outcome = loop {
        match source.get() {
            Ok(QueueItem::Sentinel) => break Ok(()),
            Ok(QueueItem::Record(record)) => {
                match panic::catch_unwind(AssertUnwindSafe(|| dispatch.dispatch(&record))) {
                    Ok(Ok(())) => stats.handled += 1,
                    Ok(Err(err)) => {
                        report(&record, &err);
                        stats.failed += 1;
                    }
                    Err(payload) => {
                        report(&record, panic_message(payload.as_ref()));
                        stats.failed += 1;
                    }
                }
            }
            Err(err @ QueueError::Decode { .. }) => {
                eprintln!("mplog listener: skipping queue item: {err}");
                stats.failed += 1;
            }
            Err(err) => break Err(err),
        }
    };
    if let Err(err) = dispatch.flush() {
        eprintln!("mplog listener: flushing handlers failed: {err}");
    }
    outcome.map(|()| stats)
}

fn report(record: &LogRecord, err: impl std::fmt::Display) {
    eprintln!(
        "mplog listener: problem handling record from {:?} (pid {}): {err}",
        record.name, record.process
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "handler panicked"
    }
}

type ListenerResult = Result<ListenerStats, QueueError>;

/// A listener running on its own thread, fed through an in-process queue.
///
/// Dereferences to the queue's producer handle, so it can be cloned into
/// `QueueHandler`s. Stopping enqueues the sentinel and joins the thread;
/// dropping the listener stops it.
pub struct QueueListener {
    sender: QueueSender,
    handler: Mutex<Option<JoinHandle<ListenerResult>>>,
}

impl Deref for QueueListener {
    type Target = QueueSender;
    fn deref(&self) -> &Self::Target {
        &self.sender
    }
}

impl Drop for QueueListener {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            eprintln!("mplog listener: {err}");
        }
    }
}

impl QueueListener {
    pub fn start<D: Dispatch + 'static>(
        sender: QueueSender,
        mut receiver: QueueReceiver,
        dispatch: D,
    ) -> Self {
        let handler = std::thread::spawn(move || run_listener(&mut receiver, &dispatch));
        Self {
            sender,
            handler: Mutex::new(Some(handler)),
        }
    }

    /// Stops the listener after every record enqueued so far was handled.
    ///
    /// Returns the stats of the run; a second call returns empty stats.
    pub fn stop(&self) -> ListenerResult {
        let Some(handle) = lock(&self.handler).take() else {
            return Ok(ListenerStats::default());
        };
        // the thread may already be gone if its source failed
        let _ = self.sender.put(QueueItem::Sentinel);
        handle.join().unwrap_or_else(|payload| {
            Err(QueueError::Io(io::Error::other(format!(
                "listener thread panicked: {}",
                panic_message(payload.as_ref())
            ))))
        })
    }
}
