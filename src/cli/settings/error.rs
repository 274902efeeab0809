//! Error types for settings operations.

use std::fmt;

/// Errors that can occur when modifying configuration settings.
#[derive(Debug)]
pub enum SettingError {
    /// The provided setting key is not recognized.
    UnknownKey(String),
    /// The provided theme identifier was not found.
    UnknownTheme { input: String },
    /// The provided value could not be parsed as a boolean.
    InvalidBoolean(String),
    /// The provided value is not a whole number in the accepted range.
    InvalidNumber {
        input: String,
        min: u64,
        max: u64,
    },
    /// The value parsed but was rejected.
    InvalidValue { key: &'static str, reason: String },
    /// Required arguments are missing.
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    /// An error occurred while persisting the configuration.
    ConfigError(String),
}

impl SettingError {
    /// Print the error message to stderr with appropriate formatting.
    pub fn print(&self) {
        match self {
            SettingError::UnknownKey(key) => {
                eprintln!("❌ Unknown config key: {key}");
                eprintln!("   Run 'chatpdf set' to list available keys.");
            }
            SettingError::UnknownTheme { input } => {
                eprintln!("❌ Unknown theme: {input}. Available themes: dark, light");
            }
            SettingError::InvalidBoolean(input) => {
                eprintln!("❌ Invalid boolean value: {input}");
                eprintln!("   Use 'on' or 'off' (also accepts true/false, yes/no)");
            }
            SettingError::InvalidNumber { input, min, max } => {
                eprintln!("❌ Invalid number: {input}");
                eprintln!("   Use a whole number from {min} to {max}");
            }
            SettingError::InvalidValue { key, reason } => {
                eprintln!("❌ Invalid value for {key}: {reason}");
            }
            SettingError::MissingArgs { hint, example } => {
                eprintln!("⚠️  {hint}");
                eprintln!("Example: {example}");
            }
            SettingError::ConfigError(msg) => {
                eprintln!("❌ Failed to save configuration: {msg}");
            }
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::UnknownTheme { input } => write!(f, "Unknown theme: {input}"),
            SettingError::InvalidBoolean(input) => write!(f, "Invalid boolean value: {input}"),
            SettingError::InvalidNumber { input, min, max } => {
                write!(f, "Invalid number: {input} (expected {min}-{max})")
            }
            SettingError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {key}: {reason}")
            }
            SettingError::MissingArgs { hint, .. } => write!(f, "{hint}"),
            SettingError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for SettingError {}
