//! Root logger configured with nothing but a file name: default level
//! (`WARNING`) and the basic `LEVEL:name:message` layout.

use mplog::{basic_config, get_logger, script_log_file};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    basic_config().with_filename(script_log_file()?).init()?;

    let logger = get_logger(module_path!());
    logger.debug("this is my debugging message");
    logger.info("this is my info message");
    logger.warning("this is my warning message");
    logger.error("this is my error message");
    logger.critical("now it is too late !!!");
    Ok(())
}
