use log::{info, warn, LevelFilter};

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::{Error, Result};

/// Environment variable that overrides the maximum log level
pub const LOG_ENV_VAR: &str = "STAMP_MATCHER_LOG";

/// Initialize the logger with timestamp, log level, and module path.
/// Logs go to a size-rotated file in `log_dir`.
pub fn init_logger(log_dir: &str, level: LevelFilter) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = format!("{}/stamp-matcher.log", log_dir);
    let archived_logs_pattern = format!("{}/stamp-matcher.{{}}.log", log_dir);

    // Rotate at 10MB, keep 5 archived files
    let file_trigger = SizeTrigger::new(10 * 1024 * 1024);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern, 5)
        .map_err(|e| Error::Configuration(format!("Failed to create log roller: {}", e)))?;

    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(log_file_path.clone(), Box::new(compound_policy))
        .map_err(|e| Error::Configuration(format!("Failed to create log appender: {}", e)))?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| Error::Configuration(format!("Failed to build log config: {}", e)))?;

    log4rs::init_config(config)
        .map_err(|e| Error::Configuration(format!("Failed to initialize log4rs: {}", e)))?;

    if let Ok(filter) = std::env::var(LOG_ENV_VAR) {
        if let Ok(level) = filter.parse::<LevelFilter>() {
            log::set_max_level(level);
        }
    }

    info!("Stamp matcher started");
    info!("Logging to file: {}", log_file_path);
    Ok(())
}

/// Log an asset that could not be decoded
pub fn log_decode_error(name: &str, error: &dyn std::error::Error) {
    warn!("Decode failed - Asset: {}, Error: {}", name, error);
}

/// Log a reference that was given a content-hash fingerprint instead
pub fn log_fallback(name: &str, error: &dyn std::error::Error) {
    warn!(
        "FALLBACK - Asset: {}, using content hash, Reason: {}",
        name, error
    );
}
