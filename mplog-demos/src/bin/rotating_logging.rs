//! Console logging for everything plus a small rotating file on the demo
//! logger, so the log file rolls over many times during one run.

use std::sync::Arc;

use mplog::{
    DEFAULT_FORMAT, Formatter, Level, RotatingFileHandler, RotationConfig, basic_config,
    get_logger, script_log_file,
};

const MAX_BYTES: u64 = 300;
const BACKUP_COUNT: u32 = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    basic_config().with_level(Level::Debug).init()?;

    let handler = RotatingFileHandler::new(
        script_log_file()?,
        RotationConfig {
            max_bytes: MAX_BYTES,
            backup_count: BACKUP_COUNT,
        },
    )?
    .with_level(Level::Debug)
    .with_formatter(Formatter::new(DEFAULT_FORMAT)?);

    let logger = get_logger(module_path!());
    logger.add_handler(Arc::new(handler));

    for i in 0..100 {
        log::debug!(target: module_path!(), "Hello, World! (count: {i:3})");
    }
    Ok(())
}
