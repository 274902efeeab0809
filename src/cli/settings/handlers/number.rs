//! Whole-number settings with an accepted range.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config, success_set};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;

pub struct NumberHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    min: u64,
    max: u64,
    get: fn(&Config) -> Option<u64>,
    set_field: fn(&mut Config, Option<u64>),
}

impl NumberHandler {
    fn parse(&self, input: &str) -> Result<u64, SettingError> {
        input
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|value| (self.min..=self.max).contains(value))
            .ok_or_else(|| SettingError::InvalidNumber {
                input: input.to_string(),
                min: self.min,
                max: self.max,
            })
    }
}

impl SettingHandler for NumberHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let value = self.parse(&args.join(" "))?;
        let set_field = self.set_field;

        mutate_config(ctx.config_path, move |config| {
            set_field(config, Some(value));
            Ok(())
        })?;

        Ok(success_set(self.key, &value.to_string()))
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;

        mutate_config(ctx.config_path, move |config| {
            set_field(config, None);
            Ok(())
        })?;

        Ok(format!(
            "✅ Unset {} (will use default: {})",
            self.key, self.default_display
        ))
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {value}", self.key),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

pub fn request_timeout_handler() -> NumberHandler {
    NumberHandler {
        key: "request-timeout-secs",
        hint: "To set the request timeout, specify a number of seconds:",
        example: "chatpdf set request-timeout-secs 60",
        default_display: "30",
        min: 1,
        max: 3600,
        get: |c| c.request_timeout_secs,
        set_field: |c, v| c.request_timeout_secs = v,
    }
}

/// Delay before re-fetching messages after a send or generation.
pub fn repoll_delay_handler() -> NumberHandler {
    NumberHandler {
        key: "repoll-delay-ms",
        hint: "To set the re-fetch delay, specify milliseconds:",
        example: "chatpdf set repoll-delay-ms 500",
        default_display: "500",
        min: 0,
        max: 60_000,
        get: |c| c.repoll_delay_ms,
        set_field: |c, v| c.repoll_delay_ms = v,
    }
}

pub fn startup_retries_handler() -> NumberHandler {
    NumberHandler {
        key: "startup-retries",
        hint: "To set how often startup requests are attempted, specify a count:",
        example: "chatpdf set startup-retries 3",
        default_display: "1",
        min: 1,
        max: 10,
        get: |c| c.startup_retries.map(u64::from),
        set_field: |c, v| c.startup_retries = v.and_then(|v| u32::try_from(v).ok()),
    }
}
