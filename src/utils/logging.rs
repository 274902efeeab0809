//! Diagnostic logging setup.
//!
//! The full-screen UI owns the terminal, so interactive runs only log when a
//! file is given. One-shot commands log to stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILTER_ENV: &str = "CHATPDF_LOG";
const DEFAULT_FILTER: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Where diagnostic output goes.
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Disabled,
}

/// Install the global subscriber. Calling this twice is harmless; the second
/// call is ignored.
pub fn init(target: LogTarget<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = tracing_subscriber::registry().with(env_filter());
    match target {
        LogTarget::Disabled => Ok(()),
        LogTarget::Stderr => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            let _ = registry.with(layer).try_init();
            Ok(())
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(file));
            let _ = registry.with(layer).try_init();
            Ok(())
        }
    }
}
