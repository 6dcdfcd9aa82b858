//! Multi-process logging: worker processes forward their records through one
//! queue to a single listener process that owns the real output.
//!
//! The orchestrator (the process the user starts) re-runs its own executable
//! for every child, telling it which part to play through `MPLOG_ROLE`. It
//! keeps the record queue: one pump thread per worker decodes the worker's
//! stdout into the queue, and a feeder thread drains the queue into the
//! listener's stdin. Records therefore reach the listener in queue arrival
//! order, and the sentinel enqueued after every worker has been joined is
//! always the last item it sees.
//!
//! ```no_run
//! use mplog::process::{ListenerProcess, Role};
//!
//! match Role::current() {
//!     Role::Listener => {
//!         mplog::process::run_listener_process(|registry| {
//!             // attach the file handler to registry.root() here
//!             Ok(())
//!         })
//!         .unwrap();
//!     }
//!     Role::Worker(name) => {
//!         mplog::process::configure_worker().unwrap();
//!         log::info!(target: "worker", "hello from {name}");
//!     }
//!     Role::Main => {
//!         let mut listener = ListenerProcess::spawn(None).unwrap();
//!         let workers: Vec<_> = (0..4).map(|_| listener.spawn_worker().unwrap()).collect();
//!         for worker in workers {
//!             worker.join().unwrap();
//!         }
//!         listener.stop().unwrap();
//!     }
//! }
//! ```

use std::{
    env,
    io::{self, BufReader, BufWriter, Read},
    process::{Child, Command, ExitStatus, Stdio},
    sync::Arc,
    thread::{self, JoinHandle},
};

use mplog_core::{
    JsonLinesSink, JsonLinesSource, Level, ListenerStats, MPLOG_CONFIG, MPLogConfig, QueueError,
    QueueHandler, QueueItem, QueueSender, RecordSink, RecordSource, record_queue, run_listener,
};

use crate::{
    bridge,
    config::ConfigError,
    logger::{Registry, registry, root_logger},
};

pub const ROLE_ENV: &str = "MPLOG_ROLE";
pub const PROCESS_NAME_ENV: &str = "MPLOG_PROCESS_NAME";

const LISTENER_NAME: &str = "Listener";

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

/// The part the current process plays, as chosen by its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Main,
    Listener,
    Worker(String),
}

impl Role {
    pub fn current() -> Self {
        Self::from_config(&MPLOG_CONFIG)
    }

    pub fn from_config(config: &MPLogConfig) -> Self {
        match config.ROLE.as_str() {
            "listener" => Role::Listener,
            "worker" => Role::Worker(config.PROCESS_NAME.clone()),
            _ => Role::Main,
        }
    }
}

fn child_command(role: &str, name: &str) -> io::Result<Command> {
    let mut command = Command::new(env::current_exe()?);
    command.env(ROLE_ENV, role).env(PROCESS_NAME_ENV, name);
    Ok(command)
}

/// The listener child plus the orchestrator-side queue feeding it.
pub struct ListenerProcess {
    child: Child,
    queue: QueueSender,
    feeder: JoinHandle<Result<(), QueueError>>,
    workers_spawned: usize,
}

impl ListenerProcess {
    /// Starts the listener process. `capacity` bounds the record queue.
    pub fn spawn(capacity: Option<usize>) -> io::Result<Self> {
        let mut child = child_command("listener", LISTENER_NAME)?
            .stdin(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("listener stdin is not piped"))?;
        let (queue, mut receiver) = record_queue(capacity);
        let feeder = thread::spawn(move || {
            let sink = JsonLinesSink::new(BufWriter::new(stdin));
            loop {
                let item = receiver.get()?;
                let last = matches!(item, QueueItem::Sentinel);
                sink.put(item)?;
                if last {
                    return Ok(());
                }
            }
        });
        Ok(Self {
            child,
            queue,
            feeder,
            workers_spawned: 0,
        })
    }

    /// Producer handle of the queue the listener consumes.
    pub fn queue(&self) -> &QueueSender {
        &self.queue
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Starts a worker process named `Process-<n>` whose records feed this listener.
    pub fn spawn_worker(&mut self) -> io::Result<WorkerProcess> {
        self.workers_spawned += 1;
        let name = format!("Process-{}", self.workers_spawned);
        let mut child = child_command("worker", &name)?
            .stdout(Stdio::piped())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("worker stdout is not piped"))?;
        let queue = self.queue.clone();
        let pump_name = name.clone();
        let pump = thread::spawn(move || pump_records(&pump_name, stdout, &queue));
        Ok(WorkerProcess { name, child, pump })
    }

    /// Enqueues the sentinel, then waits for the feeder and the listener to finish.
    ///
    /// Join every worker first, or their later records are lost.
    pub fn stop(mut self) -> Result<ExitStatus, ProcessError> {
        let sent = self.queue.close();
        let fed = self
            .feeder
            .join()
            .map_err(|_| ProcessError::Panicked("feeder"))?;
        let status = self.child.wait()?;
        shutdown_result(sent, fed)?;
        Ok(status)
    }
}

/// A dead feeder explains a failed close, so its error is reported first.
fn shutdown_result(
    sent: Result<(), QueueError>,
    fed: Result<(), QueueError>,
) -> Result<(), QueueError> {
    fed.and(sent)
}

fn pump_records<R: Read>(name: &str, stdout: R, queue: &QueueSender) -> usize {
    let mut source = JsonLinesSource::new(BufReader::new(stdout));
    let mut forwarded = 0;
    loop {
        match source.get() {
            Ok(QueueItem::Record(record)) => {
                if let Err(err) = queue.put(QueueItem::Record(record)) {
                    eprintln!("mplog: {name}: listener queue is gone: {err}");
                    break;
                }
                forwarded += 1;
            }
            // only the orchestrator may end the listener
            Ok(QueueItem::Sentinel) => {}
            Err(err @ QueueError::Decode { .. }) => eprintln!("mplog: {name}: {err}"),
            Err(_) => break,
        }
    }
    forwarded
}

/// A running worker child.
pub struct WorkerProcess {
    name: String,
    child: Child,
    pump: JoinHandle<usize>,
}

/// How a worker ended.
#[derive(Debug)]
pub struct WorkerReport {
    pub name: String,
    pub status: ExitStatus,
    /// Records this worker put into the queue.
    pub forwarded: usize,
}

impl WorkerProcess {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Waits for the worker to exit and for all of its records to be enqueued.
    pub fn join(mut self) -> Result<WorkerReport, ProcessError> {
        let status = self.child.wait()?;
        let forwarded = self
            .pump
            .join()
            .map_err(|_| ProcessError::Panicked("pump"))?;
        Ok(WorkerReport {
            name: self.name,
            status,
            forwarded,
        })
    }
}

/// Worker-side setup: every record reaching the root logger is written to
/// stdout for the orchestrator to enqueue. The root level drops to `Debug` so
/// filtering is left to the loggers that emit.
pub fn configure_worker() -> Result<(), ConfigError> {
    let root = root_logger();
    root.add_handler(Arc::new(QueueHandler::new(JsonLinesSink::new(io::stdout()))));
    root.set_level(Level::Debug);
    bridge::install()?;
    Ok(())
}

/// Listener-side main loop over stdin, dispatching through the global registry.
///
/// `configure` attaches the handlers that do the real output.
pub fn run_listener_process<F>(configure: F) -> Result<ListenerStats, ProcessError>
where
    F: FnOnce(&Registry) -> Result<(), ConfigError>,
{
    configure(registry())?;
    let stdin = io::stdin();
    let mut source = JsonLinesSource::new(stdin.lock());
    Ok(run_listener(&mut source, registry())?)
}
