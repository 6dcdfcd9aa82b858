//! Two handlers on the root logger: warnings and above go to the log file,
//! everything goes to the console.

use std::sync::Arc;

use mplog::{
    DEFAULT_FORMAT, FileHandler, Formatter, Level, StreamHandler, basic_config, get_logger,
    script_log_file,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let format = Formatter::new(DEFAULT_FORMAT)?;

    let file_handler = FileHandler::new(script_log_file()?)?
        .with_formatter(format.clone())
        .with_level(Level::Warning);
    let console_handler = StreamHandler::stderr()
        .with_formatter(format)
        .with_level(Level::Debug);

    basic_config()
        .with_level(Level::Debug)
        .with_handler(Arc::new(file_handler))
        .with_handler(Arc::new(console_handler))
        .init()?;

    let logger = get_logger(module_path!());
    logger.debug("this is my debugging message");
    logger.info("this is my info message");
    logger.warning("this is my warning message");
    logger.error("this is my error message");
    logger.critical("now it is too late !!!");
    Ok(())
}
