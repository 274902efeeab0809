use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur when loading or saving configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No platform configuration directory could be determined.
    NoConfigDir,

    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to serialize or write the configuration file.
    Write {
        path: PathBuf,
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Failed to determine config directory"),
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::NoConfigDir => None,
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Write { source, .. } => Some(source.as_ref()),
        }
    }
}

impl Config {
    /// Load the config at `config_path`; a missing file yields defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Write atomically: serialize into a temp file next to the target, then
    /// rename over it.
    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: Box<dyn StdError + Send + Sync>| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|err| write_err(Box::new(err)))?;
        }

        let contents = toml::to_string_pretty(self).map_err(|err| write_err(Box::new(err)))?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(|err| write_err(Box::new(err)))?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|err| write_err(Box::new(err)))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|err| write_err(Box::new(err)))?;
        temp_file
            .persist(config_path)
            .map_err(|err| write_err(Box::new(err.error)))?;
        Ok(())
    }

    /// Load, modify and save the config at `config_path` in one step.
    pub fn mutate_at<F, T>(config_path: &Path, mutator: F) -> Result<T, Box<dyn StdError>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn StdError>>,
    {
        let mut config = Config::load_from_path(config_path)?;
        let result = mutator(&mut config)?;
        config.save_to_path(config_path)?;
        Ok(result)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs = ProjectDirs::from("org", "chatpdf", "chatpdf").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load from the platform config location.
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::config_path()?)
    }
}
