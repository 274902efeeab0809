use super::{ChatCommand, ChatState};
use crate::api::error::ApiError;
use crate::api::{Session, DEFAULT_SESSION_TITLE};
use crate::core::message::Notice;

impl ChatState {
    pub fn load_sessions(&mut self) -> Vec<ChatCommand> {
        vec![ChatCommand::LoadSessions {
            attempts: self.settings.startup_retries,
        }]
    }

    pub(super) fn finish_load_sessions(
        &mut self,
        result: Result<Vec<Session>, ApiError>,
    ) -> Vec<ChatCommand> {
        let sessions = match result {
            Ok(sessions) => sessions,
            Err(err) => {
                self.sessions.clear();
                self.current_session_id = None;
                self.messages.clear();
                self.invalidate_selection();
                self.fail("Failed to load sessions", &err);
                return Vec::new();
            }
        };

        tracing::debug!(count = sessions.len(), "sessions loaded");
        self.sessions = sessions;
        if self.sessions.is_empty() {
            self.current_session_id = None;
            self.messages.clear();
            self.invalidate_selection();
            return self.create_session(None);
        }

        if self.current_session().is_some() {
            return Vec::new();
        }
        let first = self.sessions[0].id.clone();
        self.switch_to(first)
    }

    pub fn create_session(&mut self, title: Option<&str>) -> Vec<ChatCommand> {
        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_SESSION_TITLE);
        vec![ChatCommand::CreateSession {
            title: title.to_string(),
        }]
    }

    pub(super) fn finish_create_session(
        &mut self,
        result: Result<Session, ApiError>,
    ) -> Vec<ChatCommand> {
        match result {
            Ok(session) => {
                tracing::debug!(session = %session.id, "session created");
                self.current_session_id = Some(session.id.clone());
                self.sessions.retain(|existing| existing.id != session.id);
                self.sessions.insert(0, session);
                self.messages.clear();
                self.invalidate_selection();
            }
            Err(err) => self.fail("Failed to create session", &err),
        }
        Vec::new()
    }

    /// Make `session_id` current and reload its messages. Selecting the
    /// session that is already current does nothing.
    pub fn select_session(&mut self, session_id: &str) -> Vec<ChatCommand> {
        if !self.sessions.iter().any(|session| session.id == session_id) {
            self.push_notice(Notice::error(format!("Unknown session: {session_id}")));
            return Vec::new();
        }
        if self.current_session_id.as_deref() == Some(session_id) {
            return Vec::new();
        }
        self.switch_to(session_id.to_string())
    }

    /// 1-based position in the session list, as shown to the user.
    pub fn session_id_at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|index| self.sessions.get(index))
            .map(|session| session.id.as_str())
    }

    pub fn delete_session(&mut self, session_id: &str) -> Vec<ChatCommand> {
        if !self.sessions.iter().any(|session| session.id == session_id) {
            self.push_notice(Notice::error(format!("Unknown session: {session_id}")));
            return Vec::new();
        }
        vec![ChatCommand::DeleteSession {
            session_id: session_id.to_string(),
        }]
    }

    pub(super) fn finish_delete_session(
        &mut self,
        session_id: &str,
        result: Result<(), ApiError>,
    ) -> Vec<ChatCommand> {
        if let Err(err) = result {
            self.fail("Failed to delete session", &err);
            return Vec::new();
        }

        self.sessions.retain(|session| session.id != session_id);
        let was_current = self.current_session_id.as_deref() == Some(session_id);

        if !was_current {
            if self.sessions.is_empty() && self.settings.auto_create_on_empty {
                return self.create_session(None);
            }
            return Vec::new();
        }

        match self.sessions.first().map(|session| session.id.clone()) {
            Some(successor) => self.switch_to(successor),
            None => {
                self.current_session_id = None;
                self.messages.clear();
                self.invalidate_selection();
                if self.settings.auto_create_on_empty {
                    self.create_session(None)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Rename the session locally when it still carries the default title.
    pub(super) fn derive_title(&mut self, session_id: &str, prompt: &str) {
        let Some(session) = self
            .sessions
            .iter_mut()
            .find(|session| session.id == session_id)
        else {
            return;
        };
        if session.title != DEFAULT_SESSION_TITLE {
            return;
        }
        let first_line = prompt.lines().map(str::trim).find(|l| !l.is_empty());
        if let Some(line) = first_line {
            session.title = line.chars().take(40).collect::<String>().trim_end().to_string();
        }
    }

    /// Forget everything tied to the signed-in account.
    pub fn clear_account(&mut self) {
        self.sessions.clear();
        self.current_session_id = None;
        self.messages.clear();
        self.search_results.clear();
        self.loading = false;
        self.uploading = false;
        self.generating = false;
        self.invalidate_selection();
    }

    fn switch_to(&mut self, session_id: String) -> Vec<ChatCommand> {
        self.current_session_id = Some(session_id);
        self.messages.clear();
        self.load_messages()
    }
}
