use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const BACKEND_URL_ENV: &str = "CHATPDF_BACKEND_URL";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User configuration, stored as TOML. Every field is optional; unset fields
/// fall back to built-in defaults at the point of use.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Backend origin, without the `/api` suffix.
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub default_model: Option<String>,
    /// Render assistant messages as markdown when they look like markdown.
    pub markdown: Option<bool>,
    /// UI theme name ("dark" or "light").
    pub theme: Option<String>,
    /// Recognizer command for voice input; prints one transcript on stdout.
    pub speech_command: Option<String>,
    pub repoll_delay_ms: Option<u64>,
    pub startup_retries: Option<u32>,
    pub auto_create_on_empty: Option<bool>,
    /// Store the access token in the system keyring. When off the token
    /// lives only for the current process.
    pub keyring: Option<bool>,
}

impl Config {
    /// Backend origin with precedence: command line, then environment, then
    /// the config file, then [`DEFAULT_BACKEND_URL`].
    pub fn resolve_backend_url(&self, cli: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        self.resolve_backend_url_with(cli, env.as_deref())
    }

    pub(crate) fn resolve_backend_url_with(&self, cli: Option<&str>, env: Option<&str>) -> String {
        [cli, env, self.backend_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn keyring_enabled(&self) -> bool {
        self.keyring.unwrap_or(true)
    }
}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
