use url::Url;

use crate::modules::errors::ValidationError;
use crate::modules::types::WaitTimeRange;

pub const LOG_LEVELS: [&str; 7] = [
    "trace", "debug", "info", "success", "warning", "error", "critical",
];

pub fn non_empty(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value.to_string())
}

pub fn non_negative(field: &'static str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::Negative { field, value })
}

pub fn log_level(level: &str) -> Result<String, ValidationError> {
    let level = level.trim();
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        Ok(level.to_string())
    } else {
        Err(ValidationError::UnknownLevel(level.to_string()))
    }
}

/// Accepts an empty string (feature switched off) or an absolute http(s) url.
pub fn optional_url(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    let url = Url::parse(value).map_err(|err| ValidationError::InvalidUrl {
        field,
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(ValidationError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

pub fn wait_time(min: i64, max: i64) -> Result<WaitTimeRange, ValidationError> {
    let min = non_negative("min", min)?;
    let max = non_negative("max", max)?;
    if min > max {
        return Err(ValidationError::WaitTimeRange { min, max });
    }
    Ok(WaitTimeRange { min, max })
}
