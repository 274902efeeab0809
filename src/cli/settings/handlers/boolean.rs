//! Boolean setting handlers for on/off settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, mutate_config, parse_bool, success_set};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;

/// Data-driven handler for boolean (on/off) settings.
pub struct BooleanHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    get: fn(&Config) -> Option<bool>,
    set_field: fn(&mut Config, Option<bool>),
}

impl SettingHandler for BooleanHandler {
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

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        let set_field = self.set_field;

        mutate_config(ctx.config_path, move |config| {
            set_field(config, Some(value));
            Ok(())
        })?;

        Ok(success_set(self.key, format_bool(value)))
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
            Some(value) => format!("  {}: {}", self.key, format_bool(value)),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Create a handler for the `markdown` setting.
pub fn markdown_handler() -> BooleanHandler {
    BooleanHandler {
        key: "markdown",
        hint: "To set markdown rendering, specify on or off:",
        example: "chatpdf set markdown off",
        default_display: "on",
        get: |c| c.markdown,
        set_field: |c, v| c.markdown = v,
    }
}

/// Create a handler for the `auto-create-on-empty` setting.
pub fn auto_create_handler() -> BooleanHandler {
    BooleanHandler {
        key: "auto-create-on-empty",
        hint: "To control creating a session when none exist, specify on or off:",
        example: "chatpdf set auto-create-on-empty off",
        default_display: "on",
        get: |c| c.auto_create_on_empty,
        set_field: |c, v| c.auto_create_on_empty = v,
    }
}

/// Create a handler for the `keyring` setting.
pub fn keyring_handler() -> BooleanHandler {
    BooleanHandler {
        key: "keyring",
        hint: "To store the access token in the system keyring, specify on or off:",
        example: "chatpdf set keyring off",
        default_display: "on",
        get: |c| c.keyring,
        set_field: |c, v| c.keyring = v,
    }
}
