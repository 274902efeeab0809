//! Command-line interface parsing and handling
//!
//! With no subcommand the full-screen chat starts. The other subcommands are
//! one-shot: they make a request, print the result and exit.

pub mod settings;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::{ApiClient, OverallStatus, SearchKind};
use crate::auth::{self, KeyringTokenStore, MemoryTokenStore, SharedTokenStore};
use crate::core::backend::Backend;
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{self, LogTarget};

use self::settings::{SetContext, SettingError, SettingRegistry};

pub const PASSWORD_ENV: &str = "CHATPDF_PASSWORD";
const DEFAULT_SEARCH_LIMIT: u32 = 10;

#[derive(Parser)]
#[command(name = "chatpdf")]
#[command(version)]
#[command(about = "Chat with your PDFs from the terminal")]
#[command(
    long_about = "chatpdf is a full-screen terminal client for a PDF chat backend. Upload a PDF \
into a session, ask questions about it, and generate question sets, quizzes, Q&A and research \
summaries.\n\n\
Environment Variables:\n\
  CHATPDF_BACKEND_URL   Backend origin (default http://localhost:8001)\n\
  CHATPDF_PASSWORD      Password for login/register (otherwise read from stdin)\n\
  CHATPDF_LOG           Log filter, e.g. debug or chatpdf=trace\n\n\
Controls:\n\
  Enter             Send the message or run the /command\n\
  Alt+Enter         Insert a newline\n\
  Tab               Complete a /command\n\
  PgUp/PgDn         Scroll the conversation\n\
  F2                Toggle voice input\n\
  Esc               Close the panel, then return to the home screen\n\
  Ctrl+C            Quit\n\n\
Type /help inside the chat for the full command list."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend origin, overriding the config file and CHATPDF_BACKEND_URL
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    /// Model to use for chat and generation
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List your sessions
    Sessions,
    /// List the models the backend offers
    Models,
    /// Search PDFs and conversations across sessions
    Search {
        /// Text to search for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// What to search: all, pdfs or conversations
        #[arg(short = 't', long = "type", value_parser = parse_search_kind, default_value = "all")]
        kind: SearchKind,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Show backend health and open issues
    Health,
    /// Apply the automatic fix for a health issue
    Fix {
        /// Issue id as shown by `chatpdf health`
        issue_id: String,
        /// Apply without asking the backend for confirmation first
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Sign in and store the access token
    Login {
        email: String,
    },
    /// Create an account and sign in
    Register {
        email: String,
    },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (may be several words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

fn parse_search_kind(value: &str) -> Result<SearchKind, String> {
    SearchKind::parse(value)
        .ok_or_else(|| format!("unknown search type '{value}' (use all, pdfs or conversations)"))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Chat);

    let log_target = match (&command, args.log_file.as_deref()) {
        (_, Some(path)) => LogTarget::File(path),
        (Commands::Chat, None) => LogTarget::Disabled,
        (_, None) => LogTarget::Stderr,
    };
    logging::init(log_target)?;

    match command {
        Commands::Set { key, value } => {
            let path = Config::config_path()?;
            handle_set(&path, key, value)
        }
        Commands::Unset { key } => {
            let path = Config::config_path()?;
            handle_unset(&path, &key)
        }
        command => {
            let config = Config::load()?;
            let origin = config.resolve_backend_url(args.backend.as_deref());
            tracing::debug!(%origin, "using backend");
            let tokens = token_store(&config, &origin);
            let client =
                ApiClient::new(&origin, config.request_timeout())?.with_token_store(tokens.clone());
            run_command(command, client, tokens, config, args.model).await
        }
    }
}

async fn run_command(
    command: Commands,
    client: ApiClient,
    tokens: SharedTokenStore,
    config: Config,
    model: Option<String>,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Chat => run_chat(client, tokens, config, model).await,
        Commands::Sessions => list_sessions(&client).await,
        Commands::Models => list_models(&client).await,
        Commands::Search { query, kind, limit } => {
            search(&client, &query.join(" "), kind, limit).await
        }
        Commands::Health => show_health(&client).await,
        Commands::Fix { issue_id, yes } => fix_issue(&client, &issue_id, yes).await,
        Commands::Login { email } => authenticate(&client, &tokens, &email, false).await,
        Commands::Register { email } => authenticate(&client, &tokens, &email, true).await,
        Commands::Logout => {
            auth::logout(tokens.as_ref())?;
            println!("✅ Signed out");
            Ok(())
        }
        Commands::Whoami => whoami(&client, &tokens).await,
        Commands::Set { .. } | Commands::Unset { .. } => Ok(()),
    }
}

/// The keyring holds the token across runs; with it disabled the token lives
/// only as long as this process.
fn token_store(config: &Config, origin: &str) -> SharedTokenStore {
    if config.keyring_enabled() {
        Arc::new(KeyringTokenStore::new(origin))
    } else {
        Arc::new(MemoryTokenStore::default())
    }
}

async fn list_sessions(backend: &dyn Backend) -> Result<(), Box<dyn Error>> {
    let sessions = backend
        .list_sessions()
        .await
        .map_err(|err| err.describe("Failed to load sessions"))?;
    if sessions.is_empty() {
        println!("No sessions yet. Start one with `chatpdf` and /new.");
        return Ok(());
    }
    println!("Sessions:");
    for (index, session) in sessions.iter().enumerate() {
        let pdf = session
            .pdf_filename
            .as_deref()
            .map(|name| format!("  📄 {name}"))
            .unwrap_or_default();
        println!("  {:>2}. {} ({}){pdf}", index + 1, session.title, session.id);
    }
    Ok(())
}

async fn list_models(backend: &dyn Backend) -> Result<(), Box<dyn Error>> {
    let models = backend
        .list_models()
        .await
        .map_err(|err| err.describe("Failed to load models"))?;
    if models.is_empty() {
        println!("The backend reported no models.");
        return Ok(());
    }
    println!("Available models:");
    for model in &models {
        let provider = model
            .provider
            .as_deref()
            .map(|provider| format!(" [{provider}]"))
            .unwrap_or_default();
        let free = if model.free == Some(true) { " (free)" } else { "" };
        println!("  {} - {}{provider}{free}", model.id, model.name);
    }
    Ok(())
}

async fn search(
    backend: &dyn Backend,
    query: &str,
    kind: SearchKind,
    limit: u32,
) -> Result<(), Box<dyn Error>> {
    let response = backend
        .search(query, kind, limit)
        .await
        .map_err(|err| err.describe("Search failed"))?;
    if response.results.is_empty() {
        println!("No results for \"{query}\".");
        return Ok(());
    }
    for result in &response.results {
        println!("  {}", result.summary());
    }
    if let Some(total) = response.total_results {
        println!("{} of {total} results", response.results.len());
    }
    Ok(())
}

async fn show_health(backend: &dyn Backend) -> Result<(), Box<dyn Error>> {
    let report = backend
        .system_health()
        .await
        .map_err(|err| err.describe("Health check failed"))?;
    let status = match report.overall_status {
        OverallStatus::Healthy => "✅ healthy",
        OverallStatus::Warning => "⚠️  warning",
        OverallStatus::Critical => "❌ critical",
    };
    println!("Overall: {status}");
    let parts = [
        ("backend", &report.backend_status),
        ("database", &report.database_status),
        ("api", &report.api_status),
    ];
    for (name, value) in parts {
        if let Some(value) = value {
            println!("  {name}: {value}");
        }
    }
    let metrics = &report.metrics;
    println!(
        "  cpu {:.0}%  memory {:.0}%  disk {:.0}%  response {:.0} ms  error rate {:.1}%",
        metrics.cpu_usage,
        metrics.memory_usage,
        metrics.disk_usage,
        metrics.response_time,
        metrics.error_rate
    );
    if report.issues.is_empty() {
        println!("No open issues.");
    } else {
        println!("Issues:");
        for issue in &report.issues {
            let fixable = if issue.auto_fixable == Some(true) {
                " (fix with: chatpdf fix <id>)"
            } else {
                ""
            };
            println!(
                "  {} [{}] {}{fixable}",
                issue.id,
                issue.severity.as_deref().unwrap_or("unknown"),
                issue.message.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

async fn fix_issue(backend: &dyn Backend, issue_id: &str, yes: bool) -> Result<(), Box<dyn Error>> {
    let response = backend
        .fix_issue(issue_id, yes)
        .await
        .map_err(|err| err.describe("Failed to apply fix"))?;
    if response.success == Some(false) {
        let reason = response
            .error
            .or(response.message)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(format!("Fix for {issue_id} failed: {reason}").into());
    }
    if !yes && response.confirmed != Some(true) {
        if let Some(message) = response.message {
            println!("{message}");
        }
        println!("Run again with --yes to apply the fix.");
        return Ok(());
    }
    println!(
        "✅ {}",
        response
            .message
            .unwrap_or_else(|| format!("Fix for {issue_id} applied"))
    );
    Ok(())
}

/// Password from [`PASSWORD_ENV`], else the first line of `input`.
fn read_password(env_value: Option<String>, input: &mut dyn BufRead) -> io::Result<String> {
    if let Some(password) = env_value.filter(|value| !value.is_empty()) {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn authenticate(
    backend: &dyn Backend,
    tokens: &SharedTokenStore,
    email: &str,
    register: bool,
) -> Result<(), Box<dyn Error>> {
    let password = read_password(std::env::var(PASSWORD_ENV).ok(), &mut io::stdin().lock())?;
    let user = if register {
        auth::register(backend, tokens.as_ref(), email, &password).await?
    } else {
        auth::login(backend, tokens.as_ref(), email, &password).await?
    };
    println!("✅ Signed in as {}", user.email);
    Ok(())
}

async fn whoami(backend: &dyn Backend, tokens: &SharedTokenStore) -> Result<(), Box<dyn Error>> {
    if tokens.get().is_none() {
        println!("Not signed in. Use `chatpdf login <email>`.");
        return Ok(());
    }
    match backend.current_user().await {
        Ok(user) => {
            println!("{} ({})", user.email, user.id);
            Ok(())
        }
        Err(err) if err.is_unauthorized() => {
            println!("The stored sign-in has expired. Use `chatpdf login <email>`.");
            Ok(())
        }
        Err(err) => Err(err.describe("Failed to look up the account").into()),
    }
}

/// Apply `chatpdf set`, returning the message to print.
pub fn apply_set(path: &Path, key: &str, value: &[String]) -> Result<String, SettingError> {
    let registry = SettingRegistry::new();
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.set(value, &SetContext { config_path: path })
}

pub fn apply_unset(path: &Path, key: &str) -> Result<String, SettingError> {
    let registry = SettingRegistry::new();
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.unset(&SetContext { config_path: path })
}

/// One line per known key, in display order.
pub fn describe_settings(config: &Config) -> Vec<String> {
    let registry = SettingRegistry::new();
    registry
        .keys_display_order()
        .iter()
        .filter_map(|key| registry.get(key))
        .map(|handler| handler.format(config))
        .collect()
}

fn handle_set(path: &Path, key: Option<String>, value: Vec<String>) -> Result<(), Box<dyn Error>> {
    let Some(key) = key else {
        let config = Config::load_from_path(path)?;
        println!("Configuration ({}):", crate::core::config::data::path_display(path));
        for line in describe_settings(&config) {
            println!("{line}");
        }
        return Ok(());
    };
    match apply_set(path, &key, &value) {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(1);
        }
    }
}

fn handle_unset(path: &Path, key: &str) -> Result<(), Box<dyn Error>> {
    match apply_unset(path, key) {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(1);
        }
    }
}
