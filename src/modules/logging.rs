use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

/// Maps the level names stored in the log settings onto `log` levels.
pub fn level_filter(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" | "success" => Some(LevelFilter::Info),
        "warning" | "warn" => Some(LevelFilter::Warn),
        "error" | "critical" => Some(LevelFilter::Error),
        _ => None,
    }
}

fn log_config() -> Config {
    ConfigBuilder::new().set_time_format_rfc3339().build()
}

fn open_log_file(log_path: &Path) -> Result<File, Box<dyn Error>> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(log_path)?)
}

pub fn init_file_logger(log_path: &Path, level: LevelFilter) -> Result<(), Box<dyn Error>> {
    WriteLogger::init(level, log_config(), open_log_file(log_path)?)?;
    Ok(())
}

pub fn init_panel_logger(log_path: &Path, level: LevelFilter) -> Result<(), Box<dyn Error>> {
    CombinedLogger::init(vec![
        TermLogger::new(level, log_config(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, log_config(), open_log_file(log_path)?),
    ])?;
    Ok(())
}
