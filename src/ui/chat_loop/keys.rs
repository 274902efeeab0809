//! Key handling for each view.
//!
//! Handlers only touch [`App`]; anything that needs the network comes back
//! as a [`LoopAction`] for the event loop to spawn.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::Input as TAInput;

use crate::commands::{matching_commands, process_input, CommandResult};
use crate::core::app::{ChatCommand, NEED_SESSION_TEXT};
use crate::core::message::Notice;
use crate::ui::app::{App, Panel};
use crate::ui::view::View;

const SCROLL_STEP: u16 = 10;

#[derive(Debug, PartialEq)]
pub enum LoopAction {
    Run(Vec<ChatCommand>),
    Authenticate {
        email: String,
        password: String,
        register: bool,
    },
    Logout,
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<LoopAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.request_exit();
        return None;
    }

    match app.chat.view {
        View::Home => handle_home_key(app, key),
        View::Chat => handle_chat_key(app, key),
        View::Login => handle_login_key(app, key),
    }
}

/// Bracketed paste lands in whichever field has focus.
pub fn handle_paste(app: &mut App, text: &str) {
    let text = sanitize_pasted_text(text);
    if text.is_empty() {
        return;
    }
    match app.chat.view {
        View::Login => {
            let single_line: String = text.chars().filter(|c| *c != '\n').collect();
            app.login.active_text_mut().push_str(&single_line);
        }
        View::Chat => {
            app.textarea.insert_str(&text);
        }
        View::Home => {
            app.chat.view = View::Chat;
            app.textarea.insert_str(&text);
        }
    }
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

fn handle_home_key(app: &mut App, key: KeyEvent) -> Option<LoopAction> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('c') => app.chat.view = View::Chat,
        KeyCode::Char('l') => open_login(app, false),
        KeyCode::Char('r') => open_login(app, true),
        KeyCode::Char('?') => {
            app.panel = Panel::Help;
            app.chat.view = View::Chat;
        }
        KeyCode::Char('q') | KeyCode::Esc => app.request_exit(),
        _ => {}
    }
    None
}

fn open_login(app: &mut App, register: bool) {
    app.login.reset();
    app.login.register = register;
    app.chat.view = View::Login;
}

fn handle_chat_key(app: &mut App, key: KeyEvent) -> Option<LoopAction> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Enter if alt || shift => {
            app.textarea.insert_newline();
            None
        }
        KeyCode::Enter => submit_input(app),
        KeyCode::Tab => {
            complete_command(app);
            None
        }
        KeyCode::PageUp => {
            app.scroll_up(SCROLL_STEP);
            None
        }
        KeyCode::PageDown => {
            app.scroll_down(SCROLL_STEP);
            None
        }
        KeyCode::F(2) => {
            app.toggle_voice();
            None
        }
        KeyCode::Esc => {
            if app.panel != Panel::None {
                app.panel = Panel::None;
            } else {
                app.chat.view = View::Home;
            }
            None
        }
        _ => {
            app.textarea.input(TAInput::from(key));
            None
        }
    }
}

fn submit_input(app: &mut App) -> Option<LoopAction> {
    let text = app.input_text();
    if text.trim().is_empty() {
        return None;
    }

    if !text.trim_start().starts_with('/') {
        if app.chat.loading {
            app.set_status(Notice::warning("Still waiting for the previous reply"));
            return None;
        }
        if app.chat.current_session_id().is_none() {
            app.set_status(Notice::warning(NEED_SESSION_TEXT));
            return None;
        }
    }

    app.clear_input();
    match process_input(app, &text) {
        CommandResult::Continue => None,
        CommandResult::ProcessAsMessage(message) => {
            app.auto_scroll = true;
            app.clear_status();
            Some(LoopAction::Run(app.chat.send_message(&message)))
        }
        CommandResult::Run(commands) => Some(LoopAction::Run(commands)),
        CommandResult::Authenticate {
            email,
            password,
            register,
        } => {
            app.login.pending = true;
            Some(LoopAction::Authenticate {
                email,
                password,
                register,
            })
        }
        CommandResult::Logout => Some(LoopAction::Logout),
    }
}

/// Complete `/prefix` to a command name, or to the longest prefix shared by
/// every match.
fn complete_command(app: &mut App) {
    let text = app.input_text();
    let Some(prefix) = text.strip_prefix('/') else {
        return;
    };
    if prefix.contains(char::is_whitespace) {
        return;
    }

    let matches = matching_commands(prefix);
    match matches.as_slice() {
        [] => {}
        [only] => app.set_input_text(&format!("/{} ", only.name)),
        many => {
            let names: Vec<&str> = many.iter().map(|command| command.name).collect();
            let shared = common_prefix(&names);
            if shared.len() > prefix.len() {
                app.set_input_text(&format!("/{shared}"));
            }
            let listing: Vec<String> = names.iter().map(|name| format!("/{name}")).collect();
            app.set_status(Notice::info(listing.join("  ")));
        }
    }
}

fn common_prefix<'a>(names: &[&'a str]) -> &'a str {
    let Some(first) = names.first() else {
        return "";
    };
    let mut len = first.len();
    for name in &names[1..] {
        len = first
            .bytes()
            .zip(name.bytes())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }
    &first[..len]
}

fn handle_login_key(app: &mut App, key: KeyEvent) -> Option<LoopAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            app.login.reset();
            app.chat.view = View::Home;
            None
        }
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.login.next_field();
            None
        }
        KeyCode::Char('r') if ctrl => {
            app.login.register = !app.login.register;
            app.login.error = None;
            None
        }
        KeyCode::Enter => submit_login(app),
        KeyCode::Backspace => {
            app.login.active_text_mut().pop();
            None
        }
        KeyCode::Char(c) if !ctrl => {
            app.login.active_text_mut().push(c);
            None
        }
        _ => None,
    }
}

fn submit_login(app: &mut App) -> Option<LoopAction> {
    if app.login.pending {
        return None;
    }
    app.login.error = None;
    app.login.pending = true;
    Some(LoopAction::Authenticate {
        email: app.login.email.trim().to_string(),
        password: app.login.password.clone(),
        register: app.login.register,
    })
}
