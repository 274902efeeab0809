//! Helper functions for settings operations.

use std::path::Path;

use crate::core::config::data::Config;

use super::error::SettingError;

/// Wrapper around [`Config::mutate_at`] that maps errors to
/// [`SettingError::ConfigError`].
pub fn mutate_config<F>(path: &Path, f: F) -> Result<(), SettingError>
where
    F: FnOnce(&mut Config) -> Result<(), Box<dyn std::error::Error>>,
{
    Config::mutate_at(path, f).map_err(|e| SettingError::ConfigError(e.to_string()))
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no, 1/0 (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Shorten `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}
