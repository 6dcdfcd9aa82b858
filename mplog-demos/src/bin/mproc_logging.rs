//! Ten worker processes log through one queue into a listener process, the
//! only process that touches the (rotating) log file.
//!
//! The same executable plays every part; `mplog::process` tells the children
//! which one through the environment.

use std::{process::ExitCode, thread, time::Duration};

use mplog::{
    Formatter, MPLOG_CONFIG, PROCESS_FORMAT, RotatingFileHandler, RotationConfig,
    process::{self, ListenerProcess, ProcessError, Role},
    script_log_file,
};
use uuid::Uuid;

const LOGGERS: [&str; 3] = ["banana", "ghostwriter", "superman"];
const LEVEL: log::Level = log::Level::Debug;

const WORKERS: usize = 10;
const STEPS: usize = 10;

const FILEROTATION_MAX_BYTES: u64 = 5000;
const FILEROTATION_BACKUPS: u32 = 3;

/// Uniform in `[0, 1)`, taken from the low (random) bits of a v4 uuid.
fn random() -> f64 {
    const MANTISSA: u128 = (1 << 53) - 1;
    (Uuid::new_v4().as_u128() & MANTISSA) as f64 / (1u64 << 53) as f64
}

fn choice<T: Copy>(items: &[T]) -> T {
    items[(Uuid::new_v4().as_u128() % items.len() as u128) as usize]
}

fn listener_process() -> Result<(), ProcessError> {
    let stats = process::run_listener_process(|registry| {
        let handler = RotatingFileHandler::new(
            script_log_file()?,
            RotationConfig {
                max_bytes: FILEROTATION_MAX_BYTES,
                backup_count: FILEROTATION_BACKUPS,
            },
        )?
        .with_formatter(Formatter::new(PROCESS_FORMAT)?);
        registry.root().add_handler(std::sync::Arc::new(handler));
        Ok(())
    })?;
    if stats.failed > 0 {
        eprintln!(
            "listener: {} of {} records failed",
            stats.failed,
            stats.handled + stats.failed
        );
    }
    Ok(())
}

fn worker_process(name: &str) -> Result<(), ProcessError> {
    process::configure_worker()?;
    for step in 0..STEPS {
        let sleeping_time = random();
        thread::sleep(Duration::from_secs_f64(sleeping_time));
        let logger = choice(&LOGGERS);
        log::log!(
            target: logger,
            LEVEL,
            "Child process \"{name}\" step {step}: slept for {sleeping_time}[s]"
        );
    }
    Ok(())
}

fn main_process() -> Result<(), ProcessError> {
    let mut listener = ListenerProcess::spawn(MPLOG_CONFIG.queue_capacity())?;

    let workers = (0..WORKERS)
        .map(|_| listener.spawn_worker())
        .collect::<Result<Vec<_>, _>>()?;

    for worker in workers {
        let report = worker.join()?;
        if !report.status.success() {
            eprintln!("{} exited with {}", report.name, report.status);
        }
    }

    let status = listener.stop()?;
    if !status.success() {
        eprintln!("listener exited with {status}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let result = match Role::current() {
        Role::Listener => listener_process(),
        Role::Worker(name) => worker_process(&name),
        Role::Main => main_process(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mproc_logging: {err}");
            ExitCode::FAILURE
        }
    }
}
