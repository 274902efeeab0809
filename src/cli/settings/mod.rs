//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a [`SettingHandler`]. Handlers are data-driven
//! by value shape:
//!
//! - Boolean settings (e.g., `markdown`, `keyring`)
//! - Number settings (e.g., `request-timeout-secs`, `startup-retries`)
//! - String settings (e.g., `backend-url`, `theme`)

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use std::path::Path;

use crate::core::config::data::Config;

/// Context provided to setting handlers during set/unset operations.
pub struct SetContext<'a> {
    /// File the change is written to.
    pub config_path: &'a Path,
}

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the words after the key, returning a
    /// success message to display.
    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Unset (clear) the configuration value.
    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Format the current value for display in `chatpdf set` output.
    fn format(&self, config: &Config) -> String;
}
