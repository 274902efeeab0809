use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use super::{
    ChatCommand, ChatState, SelectionTicket, APOLOGY_TEXT, MISSING_CONTENT_TEXT, NEED_SESSION_TEXT,
};
use crate::api::error::{ApiError, UNSUPPORTED_FILE};
use crate::core::message::{validate_messages, FeatureTag, Message, Notice, RawMessage, Role};

pub fn upload_notice(filename: &str) -> String {
    format!(
        "📄 PDF \"{filename}\" uploaded successfully! You can now ask questions about this document."
    )
}

impl ChatState {
    /// Switch the feature sub-thread and reload messages for it.
    pub fn set_feature(&mut self, feature: FeatureTag) -> Vec<ChatCommand> {
        if self.current_feature == feature {
            return Vec::new();
        }
        self.current_feature = feature;
        self.messages.clear();
        self.load_messages()
    }

    /// Fetch messages for the current `(session, feature)` pair.
    pub fn load_messages(&mut self) -> Vec<ChatCommand> {
        self.load_messages_after(Duration::ZERO)
    }

    pub(super) fn load_messages_after(&mut self, delay: Duration) -> Vec<ChatCommand> {
        match self.next_ticket() {
            Some(ticket) => vec![ChatCommand::LoadMessages { ticket, delay }],
            None => {
                self.messages.clear();
                Vec::new()
            }
        }
    }

    pub(super) fn finish_load_messages(
        &mut self,
        ticket: SelectionTicket,
        result: Result<Vec<RawMessage>, ApiError>,
    ) {
        if !self.is_current(&ticket) {
            tracing::debug!(
                session = %ticket.session_id,
                feature = %ticket.feature,
                generation = ticket.generation,
                "discarding stale message load"
            );
            return;
        }
        let mut messages = match result {
            Ok(raw) => validate_messages(raw),
            Err(err) => {
                tracing::warn!(error = %err, session = %ticket.session_id, "failed to load messages");
                self.route_unauthorized(&err);
                Vec::new()
            }
        };
        let known: HashSet<String> = messages.iter().map(|m| m.id.clone()).collect();
        messages.extend(
            self.unsynced
                .iter()
                .filter(|local| !known.contains(&local.id))
                .cloned(),
        );
        self.messages = messages;
    }

    /// Optimistically append the user's message and post it. Blank input, no
    /// selected session, or a send already in flight make this a no-op.
    pub fn send_message(&mut self, text: &str) -> Vec<ChatCommand> {
        if text.trim().is_empty() || self.loading {
            return Vec::new();
        }
        let Some(session_id) = self.current_session_id.clone() else {
            return Vec::new();
        };

        let feature = self.current_feature;
        self.push_local(Message::local(Role::User, text, feature.as_str()));
        self.loading = true;

        vec![ChatCommand::SendMessage {
            session_id,
            content: text.to_string(),
            model: self.selected_model.clone(),
            feature,
        }]
    }

    pub(super) fn finish_send_message(
        &mut self,
        session_id: &str,
        feature: FeatureTag,
        prompt: &str,
        result: Result<Option<RawMessage>, ApiError>,
    ) {
        self.loading = false;

        let reply = match result {
            Ok(response) => {
                self.derive_title(session_id, prompt);
                response_or_fallback(response, feature)
            }
            Err(err) => {
                tracing::warn!(error = %err, session = %session_id, "send failed");
                self.route_unauthorized(&err);
                Message::local(Role::Assistant, APOLOGY_TEXT, feature.as_str())
            }
        };

        let still_showing = self.current_session_id.as_deref() == Some(session_id)
            && self.current_feature == feature;
        if still_showing {
            self.push_local(reply);
        } else {
            tracing::debug!(session = %session_id, "reply arrived after selection changed");
        }
    }

    pub fn upload_pdf(&mut self, path: &Path) -> Vec<ChatCommand> {
        let Some(session_id) = self.current_session_id.clone() else {
            self.push_notice(Notice::error(NEED_SESSION_TEXT));
            return Vec::new();
        };
        if self.uploading {
            return Vec::new();
        }
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            self.push_notice(Notice::error(UNSUPPORTED_FILE));
            return Vec::new();
        }

        self.uploading = true;
        vec![ChatCommand::UploadPdf {
            session_id,
            path: path.to_path_buf(),
        }]
    }

    pub(super) fn finish_upload_pdf(&mut self, session_id: &str, result: Result<String, ApiError>) {
        self.uploading = false;
        let filename = match result {
            Ok(filename) => filename,
            Err(err) => {
                self.fail("Error uploading PDF", &err);
                return;
            }
        };

        tracing::info!(session = %session_id, %filename, "pdf uploaded");
        if let Some(session) = self
            .sessions
            .iter_mut()
            .find(|session| session.id == session_id)
        {
            session.pdf_filename = Some(filename.clone());
        }
        if self.current_session_id.as_deref() != Some(session_id) {
            return;
        }
        // Feature threads are fetched with a filter, so the notice only
        // belongs in the unfiltered chat thread.
        if self.current_feature == FeatureTag::Chat {
            self.push_local(Message::local(Role::System, upload_notice(&filename), "system"));
        } else {
            self.push_notice(Notice::info(upload_notice(&filename)));
        }
    }
}

fn response_or_fallback(response: Option<RawMessage>, feature: FeatureTag) -> Message {
    let Some(raw) = response else {
        return Message::local(Role::Assistant, MISSING_CONTENT_TEXT, feature.as_str());
    };
    let content = raw.content.clone();
    raw.validate().unwrap_or_else(|| {
        let text = content
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| MISSING_CONTENT_TEXT.to_string());
        Message::local(Role::Assistant, text, feature.as_str())
    })
}
