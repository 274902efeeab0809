//! Terminal-side state layered over [`ChatState`]: the input box, status
//! line, side panels, login form and voice input.

use ratatui::text::Line;
use tui_textarea::TextArea;

use crate::api::AuthUser;
use crate::core::app::ChatState;
use crate::core::message::{Notice, NoticeKind};
use crate::core::speech::{SpeechAdapter, SpeechUpdate};
use crate::ui::markdown::render_message;
use crate::ui::theme::Theme;
use crate::ui::view::View;

/// Optional listing shown above the transcript in the chat view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    None,
    Sessions,
    Models,
    Search,
    Health,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub field: LoginField,
    pub register: bool,
    pub pending: bool,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn active_text_mut(&mut self) -> &mut String {
        match self.field {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    pub fn reset(&mut self) {
        *self = LoginForm {
            register: self.register,
            ..LoginForm::default()
        };
    }
}

pub struct App {
    pub chat: ChatState,
    pub textarea: TextArea<'static>,
    pub theme: Theme,
    pub markdown_enabled: bool,
    pub status: Option<Notice>,
    pub panel: Panel,
    pub login: LoginForm,
    pub user: Option<AuthUser>,
    pub speech: Option<SpeechAdapter>,
    pub scroll_offset: u16,
    /// Largest useful scroll offset as of the last frame.
    pub max_scroll: u16,
    pub auto_scroll: bool,
    pub exit_requested: bool,
}

impl App {
    pub fn new(chat: ChatState, theme: Theme, markdown_enabled: bool) -> Self {
        let mut app = Self {
            chat,
            textarea: TextArea::default(),
            theme,
            markdown_enabled,
            status: None,
            panel: Panel::None,
            login: LoginForm::default(),
            user: None,
            speech: None,
            scroll_offset: 0,
            max_scroll: 0,
            auto_scroll: true,
            exit_requested: false,
        };
        app.configure_textarea();
        app
    }

    pub fn with_speech(mut self, speech: SpeechAdapter) -> Self {
        self.speech = Some(speech);
        self
    }

    fn configure_textarea(&mut self) {
        self.textarea.set_cursor_line_style(ratatui::style::Style::default());
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea.set_cursor_style(self.theme.input_cursor_style);
    }

    pub fn set_status(&mut self, notice: Notice) {
        self.status = Some(notice);
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Move notices raised by the state machine onto the status line; the
    /// most recent one wins.
    pub fn absorb_notices(&mut self) -> bool {
        let notices = self.chat.take_notices();
        let changed = !notices.is_empty();
        for notice in notices {
            match notice.kind {
                NoticeKind::Error => tracing::debug!(text = %notice.text, "error notice"),
                _ => tracing::trace!(text = %notice.text, "notice"),
            }
            self.status = Some(notice);
        }
        if self.chat.view == View::Login && self.login.error.is_none() && changed {
            self.login.error = self.status.as_ref().map(|notice| notice.text.clone());
        }
        changed
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn set_input_text(&mut self, text: &str) {
        let lines: Vec<String> = if text.is_empty() {
            vec![String::new()]
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        self.textarea = TextArea::new(lines);
        self.configure_textarea();
        self.textarea.move_cursor(tui_textarea::CursorMove::Bottom);
        self.textarea.move_cursor(tui_textarea::CursorMove::End);
    }

    pub fn clear_input(&mut self) {
        self.set_input_text("");
    }

    pub fn is_listening(&self) -> bool {
        self.speech.as_ref().is_some_and(SpeechAdapter::is_listening)
    }

    /// Start or stop a recognition pass. Without a recognizer the toggle
    /// only explains why nothing happens.
    pub fn toggle_voice(&mut self) {
        let Some(speech) = self.speech.as_mut() else {
            self.set_status(Notice::warning(
                "Voice input is not configured. Set one with: chatpdf set speech-command <cmd>",
            ));
            return;
        };
        let outcome = speech.toggle().map(|()| speech.is_listening());
        match outcome {
            Ok(true) => self.set_status(Notice::info("Listening…")),
            Ok(false) => self.clear_status(),
            Err(kind) => self.set_status(Notice::error(kind.user_message())),
        }
    }

    /// Fold finished recognition passes into the input box.
    pub fn poll_speech(&mut self) -> bool {
        let mut changed = false;
        while let Some(update) = self.speech.as_mut().and_then(SpeechAdapter::poll) {
            changed = true;
            match update {
                SpeechUpdate::Transcript(text) => {
                    self.set_input_text(&text);
                    self.clear_status();
                }
                SpeechUpdate::Failed(message) => self.set_status(Notice::error(message)),
                SpeechUpdate::Ended => self.clear_status(),
            }
        }
        changed
    }

    pub fn transcript_lines(&self) -> Vec<Line<'static>> {
        self.chat
            .messages()
            .iter()
            .flat_map(|message| render_message(message, &self.theme, self.markdown_enabled))
            .collect()
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_scroll);
        if self.scroll_offset >= self.max_scroll {
            self.auto_scroll = true;
        }
    }

    pub fn request_exit(&mut self) {
        if let Some(speech) = self.speech.as_mut() {
            speech.stop_listening();
        }
        self.exit_requested = true;
    }
}
