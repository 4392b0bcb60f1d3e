//! Validation utilities for consumer settings
//!
//! Validators return `Result<_, String>` with a message fit for the user;
//! callers wrap it into their own error type.

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static CONSUMER_GROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[%a-zA-Z0-9_-]+$").expect("consumer group pattern is a valid regex")
});

/// Longest consumer group name accepted by brokers
pub const MAX_CONSUMER_GROUP_LEN: usize = 255;

/// Validate a consumer group name
pub fn validate_consumer_group(group: &str) -> Result<(), String> {
    if group.is_empty() {
        return Err("consumer group cannot be empty".to_string());
    }
    if group.len() > MAX_CONSUMER_GROUP_LEN {
        return Err(format!(
            "consumer group is {} characters long, the limit is {}",
            group.len(),
            MAX_CONSUMER_GROUP_LEN
        ));
    }
    if !CONSUMER_GROUP_PATTERN.is_match(group) {
        return Err(format!(
            "consumer group '{}' does not match the regex {}",
            group,
            CONSUMER_GROUP_PATTERN.as_str()
        ));
    }
    Ok(())
}

/// Validate that a count-like setting is non-zero
pub fn validate_positive(name: &str, value: u64) -> Result<u64, String> {
    match value {
        0 => Err(format!("{} must be greater than 0", name)),
        n => Ok(n),
    }
}

/// Validate that a duration setting is non-zero
pub fn validate_non_zero_duration(name: &str, value: Duration) -> Result<Duration, String> {
    if value.is_zero() {
        Err(format!("{} must be longer than 0ms", name))
    } else {
        Ok(value)
    }
}
