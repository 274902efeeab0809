//! Event polling, dispatching, and UI rendering loop.
//!
//! Terminal input arrives on one channel and backend results on another.
//! Each pass draws when something changed, folds input into the [`App`],
//! spawns any backend work onto tokio tasks, and applies finished work.

use std::{
    error::Error,
    sync::Arc,
    time::{Duration, Instant},
};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;

use crate::api::error::ApiError;
use crate::api::{ApiClient, AuthUser};
use crate::auth::{self, AuthError, SharedTokenStore};
use crate::core::app::{execute, ChatCommand, ChatEvent, ChatSettings, ChatState};
use crate::core::backend::Backend;
use crate::core::config::Config;
use crate::core::message::Notice;
use crate::core::speech::{CommandSpeechInput, SpeechAdapter};
use crate::ui::app::App;
use crate::ui::renderer::ui;
use crate::ui::theme::Theme;
use crate::ui::view::View;

use super::keys::{handle_key, handle_paste, LoopAction};
use super::lifecycle::{restore_terminal, setup_terminal, SharedTerminal};

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
}

/// Finished background work.
#[derive(Debug)]
enum LoopEvent {
    Chat(ChatEvent),
    Auth(Result<AuthUser, AuthError>),
    CurrentUser(Result<AuthUser, ApiError>),
}

/// Spawns backend work and routes results back to the loop.
#[derive(Clone)]
struct Dispatcher {
    backend: Arc<dyn Backend>,
    tokens: SharedTokenStore,
    tx: mpsc::UnboundedSender<LoopEvent>,
}

impl Dispatcher {
    fn run(&self, commands: Vec<ChatCommand>) {
        for command in commands {
            let backend = self.backend.clone();
            let tx = self.tx.clone();
            tracing::debug!(?command, "dispatching");
            tokio::spawn(async move {
                let event = execute(backend.as_ref(), command).await;
                let _ = tx.send(LoopEvent::Chat(event));
            });
        }
    }

    fn authenticate(&self, email: String, password: String, register: bool) {
        let backend = self.backend.clone();
        let tokens = self.tokens.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = if register {
                auth::register(backend.as_ref(), tokens.as_ref(), &email, &password).await
            } else {
                auth::login(backend.as_ref(), tokens.as_ref(), &email, &password).await
            };
            let _ = tx.send(LoopEvent::Auth(result));
        });
    }

    fn fetch_current_user(&self) {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.current_user().await;
            let _ = tx.send(LoopEvent::CurrentUser(result));
        });
    }
}

/// Build the terminal-side state from configuration and CLI overrides.
pub fn build_app(config: &Config, model: Option<String>) -> App {
    let mut settings = ChatSettings::from_config(config);
    if let Some(model) = model {
        settings.default_model = model;
    }
    let theme = config
        .theme
        .as_deref()
        .map(Theme::from_name)
        .unwrap_or_default();
    let app = App::new(ChatState::new(settings), theme, config.markdown_enabled());
    match config.speech_command.as_deref() {
        Some(command) => {
            let input = CommandSpeechInput::new(Some(command));
            app.with_speech(SpeechAdapter::new(Arc::new(input)))
        }
        None => app,
    }
}

fn apply_loop_event(app: &mut App, dispatcher: &Dispatcher, event: LoopEvent) {
    match event {
        LoopEvent::Chat(event) => {
            let follow_up = app.chat.apply(event);
            dispatcher.run(follow_up);
        }
        LoopEvent::Auth(Ok(user)) => {
            app.set_status(Notice::info(format!("Signed in as {}", user.email)));
            app.user = Some(user);
            app.login.reset();
            app.chat.clear_account();
            app.chat.view = View::Chat;
            let commands = app.chat.load_sessions();
            dispatcher.run(commands);
        }
        LoopEvent::Auth(Err(err)) => {
            tracing::warn!(error = %err, "authentication failed");
            app.login.pending = false;
            let message = err.to_string();
            if app.chat.view != View::Login {
                app.set_status(Notice::error(message.clone()));
            }
            app.login.error = Some(message);
        }
        LoopEvent::CurrentUser(Ok(user)) => {
            tracing::debug!(user = %user.email, "restored sign-in");
            app.user = Some(user);
        }
        LoopEvent::CurrentUser(Err(err)) => {
            tracing::debug!(error = %err, "no signed-in user");
            app.user = None;
        }
    }
}

fn apply_loop_action(app: &mut App, dispatcher: &Dispatcher, action: LoopAction) {
    match action {
        LoopAction::Run(commands) => dispatcher.run(commands),
        LoopAction::Authenticate {
            email,
            password,
            register,
        } => dispatcher.authenticate(email, password, register),
        LoopAction::Logout => match auth::logout(dispatcher.tokens.as_ref()) {
            Ok(()) => {
                app.user = None;
                app.chat.clear_account();
                app.login.reset();
                app.chat.view = View::Login;
                app.set_status(Notice::info("Signed out"));
            }
            Err(err) => app.set_status(Notice::error(err.to_string())),
        },
    }
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        continue;
                    }
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

async fn try_draw_frame(
    app: &mut App,
    terminal: &SharedTerminal,
    request_redraw: &mut bool,
    last_draw: &mut Instant,
    frame_duration: Duration,
) -> std::io::Result<()> {
    if !*request_redraw {
        return Ok(());
    }

    let now = Instant::now();
    if now.duration_since(*last_draw) < frame_duration {
        return Ok(());
    }

    let mut terminal_guard = terminal.lock().await;
    terminal_guard.draw(|f| ui(f, app))?;
    *last_draw = now;
    *request_redraw = false;
    Ok(())
}

/// Returns true when any event was handled.
fn process_ui_events(
    app: &mut App,
    dispatcher: &Dispatcher,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
) -> bool {
    let mut handled = false;
    while let Ok(ev) = event_rx.try_recv() {
        handled = true;
        match ev {
            UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if let Some(action) = handle_key(app, key) {
                    apply_loop_action(app, dispatcher, action);
                }
                if app.exit_requested {
                    break;
                }
            }
            UiEvent::Crossterm(Event::Paste(text)) => handle_paste(app, &text),
            UiEvent::Crossterm(_) => {}
        }
    }
    handled
}

fn process_background_events(
    app: &mut App,
    dispatcher: &Dispatcher,
    loop_rx: &mut mpsc::UnboundedReceiver<LoopEvent>,
) -> bool {
    let mut handled = false;
    while let Ok(event) = loop_rx.try_recv() {
        handled = true;
        apply_loop_event(app, dispatcher, event);
    }
    handled
}

pub async fn run_chat(
    client: ApiClient,
    tokens: SharedTokenStore,
    config: Config,
    model: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut app = build_app(&config, model);

    let (loop_tx, mut loop_rx) = mpsc::unbounded_channel::<LoopEvent>();
    let dispatcher = Dispatcher {
        backend: Arc::new(client),
        tokens: tokens.clone(),
        tx: loop_tx,
    };

    if tokens.get().is_some() {
        dispatcher.fetch_current_user();
    }
    let mut startup = app.chat.load_sessions();
    startup.extend(app.chat.load_models());
    dispatcher.run(startup);

    let terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx);

    const MAX_FPS: u64 = 60;
    let frame_duration = Duration::from_millis(1000 / MAX_FPS);
    let mut last_draw = Instant::now() - frame_duration;
    let mut request_redraw = true;
    let mut was_busy = false;

    let result: Result<(), Box<dyn Error>> = loop {
        if app.exit_requested {
            break Ok(());
        }

        if let Err(err) = try_draw_frame(
            &mut app,
            &terminal,
            &mut request_redraw,
            &mut last_draw,
            frame_duration,
        )
        .await
        {
            break Err(err.into());
        }

        let input_handled = process_ui_events(&mut app, &dispatcher, &mut event_rx);
        let background_handled = process_background_events(&mut app, &dispatcher, &mut loop_rx);
        let notices = app.absorb_notices();
        let speech = app.poll_speech();

        let busy = app.chat.is_busy() || app.login.pending;
        if input_handled || background_handled || notices || speech || busy != was_busy {
            request_redraw = true;
        }
        was_busy = busy;

        let idle = !input_handled && !background_handled && !request_redraw;
        if idle {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    event_reader_handle.abort();
    restore_terminal(&terminal).await?;
    result
}
