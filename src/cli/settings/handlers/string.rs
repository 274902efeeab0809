//! Free-form text settings, each with its own validation.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{
    mutate_config, success_set, success_unset, truncate_with_ellipsis,
};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::app::DEFAULT_MODEL;
use crate::core::config::data::{Config, DEFAULT_BACKEND_URL};
use crate::ui::theme::Theme;
use crate::utils::url::{normalize_base_url, validate_origin};

pub struct StringHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: Option<&'static str>,
    get: fn(&Config) -> Option<&str>,
    set_field: fn(&mut Config, Option<String>),
    /// Checks and canonicalizes the joined input.
    validate: fn(&str) -> Result<String, SettingError>,
}

impl SettingHandler for StringHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let value = (self.validate)(input.trim())?;
        let message = success_set(self.key, &truncate_with_ellipsis(&value, 50));
        let set_field = self.set_field;

        mutate_config(ctx.config_path, move |config| {
            set_field(config, Some(value));
            Ok(())
        })?;

        Ok(message)
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;

        mutate_config(ctx.config_path, move |config| {
            set_field(config, None);
            Ok(())
        })?;

        Ok(match self.default_display {
            Some(default) => format!("✅ Unset {} (will use default: {default})", self.key),
            None => success_unset(self.key),
        })
    }

    fn format(&self, config: &Config) -> String {
        match ((self.get)(config), self.default_display) {
            (Some(value), _) => {
                let flat = value.replace('\n', " ");
                format!("  {}: {}", self.key, truncate_with_ellipsis(&flat, 50))
            }
            (None, Some(default)) => format!("  {}: (unset, default: {default})", self.key),
            (None, None) => format!("  {}: (unset)", self.key),
        }
    }
}

fn accept_any(input: &str) -> Result<String, SettingError> {
    Ok(input.to_string())
}

fn validate_backend_url(input: &str) -> Result<String, SettingError> {
    validate_origin(input).map_err(|reason| SettingError::InvalidValue {
        key: "backend-url",
        reason,
    })?;
    Ok(normalize_base_url(input))
}

fn validate_theme(input: &str) -> Result<String, SettingError> {
    if Theme::is_known(input) {
        Ok(input.to_ascii_lowercase())
    } else {
        Err(SettingError::UnknownTheme {
            input: input.to_string(),
        })
    }
}

pub fn backend_url_handler() -> StringHandler {
    StringHandler {
        key: "backend-url",
        hint: "To set the backend, specify its origin:",
        example: "chatpdf set backend-url https://pdf.example.com",
        default_display: Some(DEFAULT_BACKEND_URL),
        get: |c| c.backend_url.as_deref(),
        set_field: |c, v| c.backend_url = v,
        validate: validate_backend_url,
    }
}

pub fn default_model_handler() -> StringHandler {
    StringHandler {
        key: "default-model",
        hint: "To set a default model, specify its id:",
        example: "chatpdf set default-model gpt-4o-mini",
        default_display: Some(DEFAULT_MODEL),
        get: |c| c.default_model.as_deref(),
        set_field: |c, v| c.default_model = v,
        validate: accept_any,
    }
}

pub fn theme_handler() -> StringHandler {
    StringHandler {
        key: "theme",
        hint: "To set a theme, specify dark or light:",
        example: "chatpdf set theme light",
        default_display: Some("dark"),
        get: |c| c.theme.as_deref(),
        set_field: |c, v| c.theme = v,
        validate: validate_theme,
    }
}

/// Recognizer command for voice input.
pub fn speech_command_handler() -> StringHandler {
    StringHandler {
        key: "speech-command",
        hint: "To enable voice input, give a command that prints one transcript:",
        example: "chatpdf set speech-command whisper-listen --once",
        default_display: None,
        get: |c| c.speech_command.as_deref(),
        set_field: |c, v| c.speech_command = v,
        validate: accept_any,
    }
}
