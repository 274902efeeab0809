//! Session and message state for a chat client.
//!
//! [`ChatState`] never performs I/O itself. Every operation mutates local
//! state and returns the [`ChatCommand`]s that must run against a
//! [`Backend`]; the result of each command comes back as a [`ChatEvent`] and
//! is folded in with [`ChatState::apply`], which may yield follow-up
//! commands. The terminal UI spawns commands onto tokio tasks, while one-shot
//! callers and tests use [`ChatState::drive`] to run them to completion.

use std::collections::VecDeque;
use std::time::Duration;

use crate::api::error::ApiError;
use crate::api::{HealthReport, ModelDescriptor, SearchResult, Session};
use crate::core::backend::Backend;
use crate::core::config::Config;
use crate::core::message::{FeatureTag, Message, Notice};
use crate::ui::view::View;

mod commands;
mod generation;
mod messages;
mod sessions;

pub use commands::{execute, ChatCommand, ChatEvent};
pub use generation::GenerationRequest;

pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";
pub const MISSING_CONTENT_TEXT: &str = "Response received but content is missing.";
pub const NEED_SESSION_TEXT: &str = "Please create a session first";
pub const NEED_PDF_TEXT: &str = "Please upload a PDF first";

/// Knobs the state machine reads; usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub default_model: String,
    pub repoll_delay: Duration,
    pub startup_retries: u32,
    pub auto_create_on_empty: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            repoll_delay: Duration::from_millis(500),
            startup_retries: 1,
            auto_create_on_empty: true,
        }
    }
}

impl ChatSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            default_model: config
                .default_model
                .clone()
                .unwrap_or(defaults.default_model),
            repoll_delay: config
                .repoll_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.repoll_delay),
            startup_retries: config.startup_retries.unwrap_or(defaults.startup_retries),
            auto_create_on_empty: config
                .auto_create_on_empty
                .unwrap_or(defaults.auto_create_on_empty),
        }
    }
}

/// Identifies the `(session, feature)` pair a message fetch was issued for.
///
/// The generation counter increases on every selection change and every new
/// fetch, so only the most recent fetch for the current pair can land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    pub session_id: String,
    pub feature: FeatureTag,
    pub generation: u64,
}

pub struct ChatState {
    settings: ChatSettings,
    sessions: Vec<Session>,
    current_session_id: Option<String>,
    messages: Vec<Message>,
    /// Messages created locally since the last fetch was issued. A fetch
    /// that lands later cannot contain them, so they are re-appended.
    unsynced: Vec<Message>,
    current_feature: FeatureTag,
    selection_generation: u64,
    pub loading: bool,
    pub uploading: bool,
    pub generating: bool,
    models: Vec<ModelDescriptor>,
    selected_model: String,
    search_results: Vec<SearchResult>,
    health: Option<HealthReport>,
    notices: VecDeque<Notice>,
    pub view: View,
}

impl ChatState {
    pub fn new(settings: ChatSettings) -> Self {
        let selected_model = settings.default_model.clone();
        Self {
            settings,
            sessions: Vec::new(),
            current_session_id: None,
            messages: Vec::new(),
            unsynced: Vec::new(),
            current_feature: FeatureTag::Chat,
            selection_generation: 0,
            loading: false,
            uploading: false,
            generating: false,
            models: Vec::new(),
            selected_model,
            search_results: Vec::new(),
            health: None,
            notices: VecDeque::new(),
            view: View::Home,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// The selected session. Always an entry of [`Self::sessions`], so there
    /// is no second copy to keep in sync.
    pub fn current_session(&self) -> Option<&Session> {
        let id = self.current_session_id.as_deref()?;
        self.sessions.iter().find(|session| session.id == id)
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_feature(&self) -> FeatureTag {
        self.current_feature
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn search_results(&self) -> &[SearchResult] {
        &self.search_results
    }

    pub fn health(&self) -> Option<&HealthReport> {
        self.health.as_ref()
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.uploading || self.generating
    }

    /// Run `commands` and every follow-up they produce until nothing is left.
    pub async fn drive(&mut self, backend: &dyn Backend, commands: Vec<ChatCommand>) {
        let mut queue: VecDeque<ChatCommand> = commands.into();
        while let Some(command) = queue.pop_front() {
            let event = execute(backend, command).await;
            queue.extend(self.apply(event));
        }
    }

    /// Fold a finished command back into the state.
    pub fn apply(&mut self, event: ChatEvent) -> Vec<ChatCommand> {
        match event {
            ChatEvent::SessionsLoaded(result) => self.finish_load_sessions(result),
            ChatEvent::SessionCreated(result) => self.finish_create_session(result),
            ChatEvent::SessionDeleted { session_id, result } => {
                self.finish_delete_session(&session_id, result)
            }
            ChatEvent::MessagesLoaded { ticket, result } => {
                self.finish_load_messages(ticket, result);
                Vec::new()
            }
            ChatEvent::MessageSent {
                session_id,
                feature,
                prompt,
                result,
            } => {
                self.finish_send_message(&session_id, feature, &prompt, result);
                Vec::new()
            }
            ChatEvent::PdfUploaded { session_id, result } => {
                self.finish_upload_pdf(&session_id, result);
                Vec::new()
            }
            ChatEvent::GenerationFinished {
                session_id,
                request,
                result,
            } => self.finish_generation(&session_id, &request, result),
            ChatEvent::ModelsLoaded(result) => {
                self.finish_load_models(result);
                Vec::new()
            }
            ChatEvent::SearchFinished { query, result } => {
                self.finish_search(&query, result);
                Vec::new()
            }
            ChatEvent::HealthChecked(result) => {
                self.finish_health(result);
                Vec::new()
            }
            ChatEvent::IssueFixed { issue_id, result } => self.finish_fix_issue(&issue_id, result),
        }
    }

    pub fn load_models(&mut self) -> Vec<ChatCommand> {
        vec![ChatCommand::LoadModels {
            attempts: self.settings.startup_retries,
        }]
    }

    fn finish_load_models(&mut self, result: Result<Vec<ModelDescriptor>, ApiError>) {
        match result {
            Ok(models) => {
                if let Some(model) =
                    crate::api::models::resolve_selection(&models, &self.selected_model)
                {
                    self.selected_model = model;
                }
                tracing::debug!(count = models.len(), selected = %self.selected_model, "models loaded");
                self.models = models;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load models");
                self.models.clear();
                self.route_unauthorized(&err);
            }
        }
    }

    /// Select by id, name, or list position. With no model list loaded the
    /// id is taken as given.
    pub fn select_model(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        if self.models.is_empty() {
            self.selected_model = query.to_string();
            return true;
        }
        match crate::api::models::find_model(&self.models, query) {
            Some(model) => {
                self.selected_model = model.id.clone();
                true
            }
            None => {
                self.push_notice(Notice::error(format!("Unknown model: {query}")));
                false
            }
        }
    }

    pub fn search(&mut self, query: &str, kind: crate::api::SearchKind, limit: u32) -> Vec<ChatCommand> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        vec![ChatCommand::Search {
            query: query.to_string(),
            kind,
            limit,
        }]
    }

    fn finish_search(&mut self, query: &str, result: Result<crate::api::SearchResponse, ApiError>) {
        match result {
            Ok(response) => {
                if response.results.is_empty() {
                    self.push_notice(Notice::info(format!("No results for \"{query}\"")));
                }
                self.search_results = response.results;
            }
            Err(err) => {
                self.search_results.clear();
                self.fail("Search failed", &err);
            }
        }
    }

    pub fn check_health(&mut self) -> Vec<ChatCommand> {
        vec![ChatCommand::CheckHealth]
    }

    fn finish_health(&mut self, result: Result<HealthReport, ApiError>) {
        match result {
            Ok(report) => self.health = Some(report),
            Err(err) => self.fail("Failed to load system health", &err),
        }
    }

    pub fn fix_issue(&mut self, issue_id: &str, confirm: bool) -> Vec<ChatCommand> {
        let issue_id = issue_id.trim();
        if issue_id.is_empty() {
            return Vec::new();
        }
        vec![ChatCommand::FixIssue {
            issue_id: issue_id.to_string(),
            confirm,
        }]
    }

    fn finish_fix_issue(
        &mut self,
        issue_id: &str,
        result: Result<crate::api::FixResponse, ApiError>,
    ) -> Vec<ChatCommand> {
        match result {
            Ok(response) if response.success == Some(false) => {
                let reason = response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "unknown error".to_string());
                self.push_notice(Notice::error(format!("Fix for {issue_id} failed: {reason}")));
                Vec::new()
            }
            Ok(response) => {
                let text = response
                    .message
                    .unwrap_or_else(|| format!("Fix for {issue_id} applied"));
                self.push_notice(Notice::info(text));
                vec![ChatCommand::CheckHealth]
            }
            Err(err) => {
                self.fail("Failed to apply fix", &err);
                Vec::new()
            }
        }
    }

    /// Record a failed request as a notice; an auth failure also routes to
    /// the login view.
    fn fail(&mut self, action: &str, err: &ApiError) {
        tracing::warn!(error = %err, "{action}");
        self.push_notice(Notice::error(err.describe(action)));
        self.route_unauthorized(err);
    }

    fn route_unauthorized(&mut self, err: &ApiError) {
        if err.is_unauthorized() {
            self.view = View::Login;
        }
    }

    fn next_ticket(&mut self) -> Option<SelectionTicket> {
        self.selection_generation += 1;
        self.unsynced.clear();
        Some(SelectionTicket {
            session_id: self.current_session_id.clone()?,
            feature: self.current_feature,
            generation: self.selection_generation,
        })
    }

    /// Invalidate every outstanding fetch without issuing a new one.
    fn invalidate_selection(&mut self) {
        self.selection_generation += 1;
        self.unsynced.clear();
    }

    /// Show a locally created message and keep it across an in-flight load.
    fn push_local(&mut self, message: Message) {
        self.unsynced.push(message.clone());
        self.messages.push(message);
    }

    fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.generation == self.selection_generation
            && self.current_session_id.as_deref() == Some(ticket.session_id.as_str())
            && self.current_feature == ticket.feature
    }
}

#[cfg(test)]
mod tests;
