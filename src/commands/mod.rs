//! Slash commands typed into the chat input.
//!
//! [`process_input`] either consumes the line as a command, mutating the
//! [`App`] and possibly returning backend work to run, or hands it back to be
//! sent as a chat message.

mod registry;

pub use registry::{all_commands, matching_commands, Command, CommandInvocation};

use std::path::PathBuf;

use chrono::Local;

use crate::api::SearchKind;
use crate::core::app::ChatCommand;
use crate::core::backend::{QuestionParams, QuizParams};
use crate::core::message::{FeatureTag, Notice};
use crate::ui::app::{App, LoginField, Panel};
use crate::ui::view::View;
use crate::utils::transcript::export_transcript;

pub const SEARCH_LIMIT: u32 = 10;
const QUESTION_TYPES: [&str; 4] = ["faq", "mcq", "true_false", "mixed"];
const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    /// Backend work for the chat loop to spawn.
    Run(Vec<ChatCommand>),
    Authenticate {
        email: String,
        password: String,
        register: bool,
    },
    Logout,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => {
            let invocation = CommandInvocation {
                input: trimmed,
                args,
            };
            (command.handler)(app, invocation)
        }
        None => {
            app.set_status(Notice::error(format!(
                "Unknown command: /{command_name} (try /help)"
            )));
            CommandResult::Continue
        }
    }
}

fn usage(app: &mut App, name: &str) -> CommandResult {
    if let Some(command) = registry::find_command(name) {
        app.set_status(Notice::warning(format!("Usage: {}", command.usage)));
    }
    CommandResult::Continue
}

fn run(app: &mut App, commands: Vec<ChatCommand>) -> CommandResult {
    app.chat.view = View::Chat;
    CommandResult::Run(commands)
}

/// A session reference: a 1-based list position or a literal id.
fn resolve_session(app: &App, reference: &str) -> Option<String> {
    if let Ok(position) = reference.parse::<usize>() {
        if let Some(id) = app.chat.session_id_at(position) {
            return Some(id.to_string());
        }
    }
    app.chat
        .sessions()
        .iter()
        .find(|session| session.id == reference)
        .map(|session| session.id.clone())
}

pub(super) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.panel = Panel::Help;
    app.chat.view = View::Chat;
    CommandResult::Continue
}

pub(super) fn handle_new(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let title = Some(invocation.args).filter(|title| !title.is_empty());
    let commands = app.chat.create_session(title);
    run(app, commands)
}

pub(super) fn handle_sessions(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.panel = Panel::Sessions;
    app.chat.view = View::Chat;
    if app.chat.sessions().is_empty() {
        let commands = app.chat.load_sessions();
        return CommandResult::Run(commands);
    }
    CommandResult::Continue
}

pub(super) fn handle_select(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return usage(app, "select");
    }
    match resolve_session(app, invocation.args) {
        Some(session_id) => {
            app.panel = Panel::None;
            let commands = app.chat.select_session(&session_id);
            run(app, commands)
        }
        None => {
            app.set_status(Notice::error(format!(
                "No session matches \"{}\"",
                invocation.args
            )));
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let target = if invocation.args.is_empty() {
        app.chat.current_session_id().map(str::to_string)
    } else {
        resolve_session(app, invocation.args)
    };
    match target {
        Some(session_id) => {
            let commands = app.chat.delete_session(&session_id);
            run(app, commands)
        }
        None => {
            app.set_status(Notice::error("No session to delete"));
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_feature(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let names: Vec<&str> = FeatureTag::ALL.iter().map(|tag| tag.as_str()).collect();
        app.set_status(Notice::info(format!(
            "Current feature: {}. Available: {}",
            app.chat.current_feature().display_name(),
            names.join(", ")
        )));
        return CommandResult::Continue;
    }
    match FeatureTag::parse(invocation.args) {
        Some(feature) => {
            let commands = app.chat.set_feature(feature);
            app.set_status(Notice::info(format!("Feature: {}", feature.display_name())));
            run(app, commands)
        }
        None => {
            app.set_status(Notice::error(format!(
                "Unknown feature: {}",
                invocation.args
            )));
            CommandResult::Continue
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new() {
            return home.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}

pub(super) fn handle_upload(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return usage(app, "upload");
    }
    let path = expand_home(invocation.args.trim_matches('"'));
    let commands = app.chat.upload_pdf(&path);
    if !commands.is_empty() {
        app.set_status(Notice::info(format!("Uploading {}…", path.display())));
    }
    run(app, commands)
}

pub(super) fn handle_questions(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut params = QuestionParams::default();
    let mut words = invocation.words().into_iter();
    if let Some(kind) = words.next() {
        let kind = kind.to_ascii_lowercase();
        if !QUESTION_TYPES.contains(&kind.as_str()) {
            return usage(app, "questions");
        }
        params.question_type = kind;
    }
    let chapter = words.collect::<Vec<_>>().join(" ");
    if !chapter.is_empty() {
        params.chapter_segment = Some(chapter);
    }
    let commands = app.chat.generate_questions(params);
    run(app, commands)
}

pub(super) fn handle_quiz(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut params = QuizParams::default();
    let words = invocation.words();
    if let Some(kind) = words.first() {
        params.quiz_type = kind.to_ascii_lowercase();
    }
    if let Some(difficulty) = words.get(1) {
        let difficulty = difficulty.to_ascii_lowercase();
        if !DIFFICULTIES.contains(&difficulty.as_str()) {
            return usage(app, "quiz");
        }
        params.difficulty = difficulty;
    }
    if let Some(count) = words.get(2) {
        match count.parse::<u32>() {
            Ok(count) if count > 0 => params.question_count = count,
            _ => return usage(app, "quiz"),
        }
    }
    let commands = app.chat.generate_quiz(params);
    run(app, commands)
}

pub(super) fn handle_qa(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let commands = app.chat.generate_qa();
    run(app, commands)
}

pub(super) fn handle_research(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let commands = app.chat.conduct_research(invocation.args);
    run(app, commands)
}

pub(super) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.panel = Panel::Models;
        app.chat.view = View::Chat;
        if app.chat.models().is_empty() {
            let commands = app.chat.load_models();
            return CommandResult::Run(commands);
        }
        return CommandResult::Continue;
    }
    if app.chat.select_model(invocation.args) {
        app.panel = Panel::None;
        app.set_status(Notice::info(format!(
            "Model set: {}",
            app.chat.selected_model()
        )));
    }
    CommandResult::Continue
}

pub(super) fn handle_search(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return usage(app, "search");
    }
    app.panel = Panel::Search;
    let commands = app
        .chat
        .search(invocation.args, SearchKind::All, SEARCH_LIMIT);
    run(app, commands)
}

pub(super) fn handle_health(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.panel = Panel::Health;
    let commands = app.chat.check_health();
    run(app, commands)
}

pub(super) fn handle_voice(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.toggle_voice();
    CommandResult::Continue
}

pub(super) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let filename = if invocation.args.is_empty() {
        format!("chatpdf-{}.txt", Local::now().format("%Y-%m-%d"))
    } else {
        invocation.args.to_string()
    };
    let path = expand_home(&filename);
    match export_transcript(&path, app.chat.current_session(), app.chat.messages(), false) {
        Ok(count) => app.set_status(Notice::info(format!(
            "Exported {count} messages to {}",
            path.display()
        ))),
        Err(err) => app.set_status(Notice::error(format!("Export failed: {err}"))),
    }
    CommandResult::Continue
}

pub(super) fn handle_markdown(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.markdown_enabled = !app.markdown_enabled;
    let state = if app.markdown_enabled { "on" } else { "off" };
    app.set_status(Notice::info(format!("Markdown rendering {state}")));
    CommandResult::Continue
}

pub(super) fn handle_home(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.panel = Panel::None;
    app.chat.view = View::Home;
    CommandResult::Continue
}

fn authenticate(app: &mut App, invocation: CommandInvocation<'_>, register: bool) -> CommandResult {
    let words = invocation.words();
    match words.as_slice() {
        [email, password, ..] => CommandResult::Authenticate {
            email: email.to_string(),
            password: password.to_string(),
            register,
        },
        rest => {
            app.login.reset();
            app.login.register = register;
            if let Some(email) = rest.first() {
                app.login.email = email.to_string();
                app.login.field = LoginField::Password;
            }
            app.chat.view = View::Login;
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_login(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    authenticate(app, invocation, false)
}

pub(super) fn handle_register(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    authenticate(app, invocation, true)
}

pub(super) fn handle_logout(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Logout
}

pub(super) fn handle_quit(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.request_exit();
    CommandResult::Continue
}

#[cfg(test)]
mod tests;
