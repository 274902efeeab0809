use super::*;
use crate::api::{
    AuthResponse, AuthUser, FixResponse, HealthReport, ModelDescriptor, SearchKind,
    SearchResponse, Session, DEFAULT_SESSION_TITLE,
};
use crate::core::backend::{Backend, QuestionParams, QuizParams};
use crate::core::message::{NoticeKind, RawMessage, Role};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct FakeInner {
    sessions: Vec<Session>,
    messages: HashMap<String, Vec<RawMessage>>,
    next_id: u32,
    calls: Vec<String>,
    fail_sends: bool,
    fail_list_sessions: bool,
    fail_deletes: bool,
    unauthorized: bool,
    reply: Option<Option<RawMessage>>,
    models: Vec<ModelDescriptor>,
}

/// In-memory backend that records every call it receives.
#[derive(Default)]
struct FakeBackend {
    inner: Mutex<FakeInner>,
}

impl FakeBackend {
    fn with_sessions(ids: &[&str]) -> Self {
        let backend = FakeBackend::default();
        {
            let mut inner = backend.inner.lock().unwrap();
            for id in ids {
                inner.sessions.push(session(id));
                inner
                    .messages
                    .insert(id.to_string(), vec![raw("user", &format!("hello from {id}"), "chat")]);
            }
        }
        backend
    }

    fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn configure(&self, f: impl FnOnce(&mut FakeInner)) {
        f(&mut self.inner.lock().unwrap());
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.unauthorized {
            return Err(ApiError::Unauthorized { detail: None });
        }
        Ok(())
    }
}

fn session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        title: DEFAULT_SESSION_TITLE.to_string(),
        pdf_filename: None,
        created_at: None,
        updated_at: None,
    }
}

fn raw(role: &str, content: &str, feature: &str) -> RawMessage {
    RawMessage {
        id: None,
        role: Some(role.to_string()),
        content: Some(content.to_string()),
        timestamp: Some(serde_json::Value::String("2024-01-01T00:00:00Z".into())),
        feature_type: Some(feature.to_string()),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record("list_sessions".into())?;
        let inner = self.inner.lock().unwrap();
        if inner.fail_list_sessions {
            return Err(ApiError::Timeout);
        }
        Ok(inner.sessions.clone())
    }

    async fn create_session(&self, title: &str) -> Result<Session, ApiError> {
        self.record(format!("create_session {title}"))?;
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let mut created = session(&format!("new-{}", inner.next_id));
        created.title = title.to_string();
        inner.sessions.insert(0, created.clone());
        Ok(created)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.record(format!("delete_session {session_id}"))?;
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_deletes {
            return Err(ApiError::Timeout);
        }
        inner.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: &str,
        feature: FeatureTag,
    ) -> Result<Vec<RawMessage>, ApiError> {
        self.record(format!("list_messages {session_id} {feature}"))?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .get(session_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|m| m.feature_type.as_deref() == Some(feature.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        model: &str,
        feature: FeatureTag,
    ) -> Result<Option<RawMessage>, ApiError> {
        self.record(format!("send_message {session_id} {model} {feature}"))?;
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_sends {
            return Err(ApiError::Timeout);
        }
        if let Some(reply) = inner.reply.clone() {
            return Ok(reply);
        }
        let reply = raw("assistant", &format!("About: {content}"), feature.as_str());
        let thread = inner.messages.entry(session_id.to_string()).or_default();
        thread.push(raw("user", content, feature.as_str()));
        thread.push(reply.clone());
        Ok(Some(reply))
    }

    async fn upload_pdf(&self, session_id: &str, path: &Path) -> Result<String, ApiError> {
        self.record(format!("upload_pdf {session_id}"))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut inner = self.inner.lock().unwrap();
        if let Some(s) = inner.sessions.iter_mut().find(|s| s.id == session_id) {
            s.pdf_filename = Some(filename.clone());
        }
        Ok(filename)
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ApiError> {
        self.record("list_models".into())?;
        Ok(self.inner.lock().unwrap().models.clone())
    }

    async fn generate_questions(
        &self,
        session_id: &str,
        _model: &str,
        params: &QuestionParams,
    ) -> Result<(), ApiError> {
        self.record(format!("generate_questions {session_id} {}", params.question_type))?;
        self.inner
            .lock()
            .unwrap()
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(raw("assistant", "1. What is it?", "question_generation"));
        Ok(())
    }

    async fn generate_quiz(
        &self,
        session_id: &str,
        _model: &str,
        params: &QuizParams,
    ) -> Result<(), ApiError> {
        self.record(format!("generate_quiz {session_id} {}", params.difficulty))
    }

    async fn generate_qa(&self, session_id: &str, _model: &str) -> Result<(), ApiError> {
        self.record(format!("generate_qa {session_id}"))?;
        self.inner
            .lock()
            .unwrap()
            .messages
            .entry(session_id.to_string())
            .or_default()
            .push(raw("assistant", "Q: why? A: because.", "qa_generation"));
        Ok(())
    }

    async fn conduct_research(
        &self,
        session_id: &str,
        _model: &str,
        research_type: &str,
    ) -> Result<(), ApiError> {
        self.record(format!("conduct_research {session_id} {research_type}"))
    }

    async fn search(
        &self,
        query: &str,
        _kind: SearchKind,
        _limit: u32,
    ) -> Result<SearchResponse, ApiError> {
        self.record(format!("search {query}"))?;
        Ok(SearchResponse {
            results: Vec::new(),
            total_results: Some(0),
        })
    }

    async fn system_health(&self) -> Result<HealthReport, ApiError> {
        self.record("system_health".into())?;
        serde_json::from_str(r#"{"overall_status": "healthy"}"#)
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn fix_issue(&self, issue_id: &str, _confirm: bool) -> Result<FixResponse, ApiError> {
        self.record(format!("fix_issue {issue_id}"))?;
        Ok(FixResponse {
            confirmed: Some(true),
            success: Some(true),
            message: Some("Cache cleared".into()),
            error: None,
        })
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
        Err(ApiError::Unauthorized { detail: None })
    }

    async fn register(&self, _email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
        Err(ApiError::Unauthorized { detail: None })
    }

    async fn current_user(&self) -> Result<AuthUser, ApiError> {
        Err(ApiError::Unauthorized { detail: None })
    }
}

fn test_state() -> ChatState {
    ChatState::new(ChatSettings {
        repoll_delay: Duration::ZERO,
        ..ChatSettings::default()
    })
}

async fn loaded_state(backend: &FakeBackend) -> ChatState {
    let mut state = test_state();
    let commands = state.load_sessions();
    state.drive(backend, commands).await;
    state
}

fn contents(state: &ChatState) -> Vec<&str> {
    state.messages().iter().map(|m| m.content.as_str()).collect()
}

#[tokio::test]
async fn created_sessions_are_prepended_and_selected() {
    let backend = FakeBackend::default();
    let mut state = test_state();

    for title in ["first", "second", "third"] {
        let commands = state.create_session(Some(title));
        state.drive(&backend, commands).await;
        assert_eq!(state.sessions()[0].title, title);
        assert_eq!(state.current_session_id(), Some(state.sessions()[0].id.as_str()));
        assert!(state.messages().is_empty());
    }
    assert_eq!(state.sessions().len(), 3);
}

#[tokio::test]
async fn create_session_defaults_title() {
    let backend = FakeBackend::default();
    let mut state = test_state();
    let commands = state.create_session(Some("   "));
    state.drive(&backend, commands).await;
    assert_eq!(state.sessions()[0].title, DEFAULT_SESSION_TITLE);
}

#[tokio::test]
async fn empty_session_list_creates_one() {
    let backend = FakeBackend::default();
    let state = loaded_state(&backend).await;

    assert_eq!(state.sessions().len(), 1);
    assert!(state.current_session().is_some());
    assert_eq!(
        backend.calls(),
        vec!["list_sessions".to_string(), "create_session New Chat".to_string()]
    );
}

#[tokio::test]
async fn failed_session_load_resets_to_empty() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    assert_eq!(state.sessions().len(), 1);

    backend.configure(|inner| inner.fail_list_sessions = true);
    let commands = state.load_sessions();
    state.drive(&backend, commands).await;

    assert!(state.sessions().is_empty());
    assert!(state.current_session().is_none());
    assert!(state.messages().is_empty());
    let notices = state.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
}

#[tokio::test]
async fn clearing_the_account_drops_sessions_and_messages() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;
    assert!(!state.messages().is_empty());

    state.clear_account();
    assert!(state.sessions().is_empty());
    assert!(state.current_session_id().is_none());
    assert!(state.messages().is_empty());
    assert!(!state.is_busy());
}

#[tokio::test]
async fn loading_sessions_selects_first_and_loads_its_messages() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let state = loaded_state(&backend).await;

    assert_eq!(state.current_session_id(), Some("a"));
    assert_eq!(contents(&state), ["hello from a"]);
}

#[tokio::test]
async fn deleting_current_session_selects_first_remaining() {
    let backend = FakeBackend::with_sessions(&["a", "b", "c"]);
    let mut state = loaded_state(&backend).await;

    let commands = state.delete_session("a");
    state.drive(&backend, commands).await;

    let ids: Vec<_> = state.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["b", "c"]);
    assert_eq!(state.current_session_id(), Some("b"));
    assert_eq!(contents(&state), ["hello from b"]);
}

#[tokio::test]
async fn deleting_other_session_keeps_selection() {
    let backend = FakeBackend::with_sessions(&["a", "b", "c"]);
    let mut state = loaded_state(&backend).await;

    let commands = state.delete_session("c");
    state.drive(&backend, commands).await;

    let ids: Vec<_> = state.sessions().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(state.current_session_id(), Some("a"));
    assert_eq!(contents(&state), ["hello from a"]);
}

#[tokio::test]
async fn deleting_last_session_creates_a_fresh_one() {
    let backend = FakeBackend::with_sessions(&["only"]);
    let mut state = loaded_state(&backend).await;

    let commands = state.delete_session("only");
    state.drive(&backend, commands).await;

    assert_eq!(state.sessions().len(), 1);
    assert_ne!(state.sessions()[0].id, "only");
    assert_eq!(state.current_session_id(), Some(state.sessions()[0].id.as_str()));
    assert!(state.messages().is_empty());
}

#[tokio::test]
async fn deleting_last_session_without_auto_create_clears_selection() {
    let backend = FakeBackend::with_sessions(&["only"]);
    let mut state = ChatState::new(ChatSettings {
        auto_create_on_empty: false,
        ..ChatSettings::default()
    });
    let commands = state.load_sessions();
    state.drive(&backend, commands).await;

    let commands = state.delete_session("only");
    state.drive(&backend, commands).await;

    assert!(state.sessions().is_empty());
    assert!(state.current_session().is_none());
    assert!(state.messages().is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_session() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;
    backend.configure(|inner| inner.fail_deletes = true);

    let commands = state.delete_session("a");
    state.drive(&backend, commands).await;

    assert_eq!(state.sessions().len(), 2);
    assert_eq!(state.current_session_id(), Some("a"));
    assert_eq!(state.take_notices().len(), 1);
}

#[test]
fn selecting_unknown_session_is_rejected() {
    let mut state = test_state();
    assert!(state.select_session("ghost").is_empty());
    assert!(state.current_session().is_none());
    assert_eq!(state.take_notices().len(), 1);
}

#[tokio::test]
async fn reselecting_current_session_does_not_reload() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;
    assert!(state.select_session("a").is_empty());
}

#[tokio::test]
async fn stale_message_load_never_overwrites_newer_selection() {
    let backend = FakeBackend::with_sessions(&["a", "b", "c"]);
    let mut state = loaded_state(&backend).await;

    let slow = state.select_session("b");
    let fast = state.select_session("c");
    assert_eq!(slow.len(), 1);
    assert_eq!(fast.len(), 1);

    let fast_event = execute(&backend, fast[0].clone()).await;
    let slow_event = execute(&backend, slow[0].clone()).await;

    state.apply(fast_event);
    assert_eq!(contents(&state), ["hello from c"]);
    state.apply(slow_event);
    assert_eq!(state.current_session_id(), Some("c"));
    assert_eq!(contents(&state), ["hello from c"]);
}

#[tokio::test]
async fn switching_away_and_back_discards_the_first_load() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let to_b = state.select_session("b");
    let back_to_a = state.select_session("a");
    let stale = execute(&backend, to_b[0].clone()).await;
    state.apply(stale);
    assert!(state.messages().is_empty());

    let fresh = execute(&backend, back_to_a[0].clone()).await;
    state.apply(fresh);
    assert_eq!(contents(&state), ["hello from a"]);
}

#[tokio::test]
async fn feature_switch_filters_and_discards_chat_load() {
    let backend = FakeBackend::with_sessions(&["a"]);
    backend.configure(|inner| {
        inner
            .messages
            .get_mut("a")
            .unwrap()
            .push(raw("assistant", "summary", "research"));
    });
    let mut state = loaded_state(&backend).await;

    let chat_reload = state.load_messages();
    let research = state.set_feature(FeatureTag::Research);
    let research_event = execute(&backend, research[0].clone()).await;
    let chat_event = execute(&backend, chat_reload[0].clone()).await;
    state.apply(research_event);
    state.apply(chat_event);

    assert_eq!(state.current_feature(), FeatureTag::Research);
    assert_eq!(contents(&state), ["summary"]);
    assert!(backend
        .calls()
        .contains(&"list_messages a research".to_string()));
}

#[tokio::test]
async fn malformed_messages_are_dropped_on_load() {
    let backend = FakeBackend::with_sessions(&["a"]);
    backend.configure(|inner| {
        let thread = inner.messages.get_mut("a").unwrap();
        thread.push(RawMessage {
            role: None,
            ..raw("assistant", "no role", "chat")
        });
        thread.push(RawMessage {
            content: None,
            ..raw("assistant", "", "chat")
        });
        thread.push(raw("assistant", "", "chat"));
    });
    let state = loaded_state(&backend).await;

    assert_eq!(contents(&state), ["hello from a", ""]);
}

#[tokio::test]
async fn failed_message_load_clears_the_list() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;
    assert!(!state.messages().is_empty());

    let commands = state.select_session("b");
    let ChatCommand::LoadMessages { ticket, .. } = commands[0].clone() else {
        panic!("expected a message load");
    };
    state.apply(ChatEvent::MessagesLoaded {
        ticket,
        result: Err(ApiError::Timeout),
    });
    assert!(state.messages().is_empty());
}

#[tokio::test]
async fn blank_send_is_a_noop() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    let before = state.messages().len();
    let calls_before = backend.calls().len();

    for text in ["", "   ", "\n\t"] {
        assert!(state.send_message(text).is_empty());
    }
    assert_eq!(state.messages().len(), before);
    assert_eq!(backend.calls().len(), calls_before);
}

#[test]
fn send_without_session_is_a_noop() {
    let mut state = test_state();
    assert!(state.send_message("hello").is_empty());
    assert!(state.messages().is_empty());
}

#[tokio::test]
async fn send_while_loading_is_a_noop() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;

    let first = state.send_message("one");
    assert_eq!(first.len(), 1);
    assert!(state.loading);
    let len = state.messages().len();

    assert!(state.send_message("two").is_empty());
    assert_eq!(state.messages().len(), len);

    let event = execute(&backend, first[0].clone()).await;
    state.apply(event);
    assert!(!state.loading);
    let sends = backend
        .calls()
        .iter()
        .filter(|call| call.starts_with("send_message"))
        .count();
    assert_eq!(sends, 1);
}

#[tokio::test]
async fn upload_mirrors_filename_into_session_list() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let commands = state.upload_pdf(Path::new("/tmp/docs/report.pdf"));
    assert!(state.uploading);
    state.drive(&backend, commands).await;

    assert!(!state.uploading);
    let current = state.current_session().unwrap();
    assert_eq!(current.pdf_filename.as_deref(), Some("report.pdf"));
    let listed = state.sessions().iter().find(|s| s.id == "a").unwrap();
    assert_eq!(listed.pdf_filename, current.pdf_filename);
    let last = state.messages().last().unwrap();
    assert_eq!(last.role, Role::System);
    assert!(last.content.contains("\"report.pdf\""));
}

#[test]
fn upload_requires_session() {
    let mut state = test_state();
    assert!(state.upload_pdf(Path::new("report.pdf")).is_empty());
    let notices = state.take_notices();
    assert_eq!(notices[0].text, NEED_SESSION_TEXT);
    assert!(!state.uploading);
}

#[tokio::test]
async fn upload_rejects_non_pdf_files() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    assert!(state.upload_pdf(Path::new("notes.txt")).is_empty());
    assert_eq!(state.take_notices().len(), 1);
}

#[tokio::test]
async fn upload_then_send_orders_notice_question_and_answer() {
    let backend = FakeBackend::default();
    let mut state = test_state();

    let commands = state.create_session(None);
    state.drive(&backend, commands).await;
    let commands = state.upload_pdf(Path::new("report.pdf"));
    state.drive(&backend, commands).await;
    let commands = state.send_message("What is this about?");
    state.drive(&backend, commands).await;

    let roles: Vec<Role> = state.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant]);
    assert_eq!(state.messages()[1].content, "What is this about?");
    assert_eq!(state.messages()[1].feature_type, "chat");
    assert!(!state.loading);
}

#[tokio::test]
async fn network_failure_appends_one_apology() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    backend.configure(|inner| inner.fail_sends = true);
    let assistants_before = state.messages().iter().filter(|m| m.is_assistant()).count();

    let commands = state.send_message("hello?");
    state.drive(&backend, commands).await;

    let assistants: Vec<_> = state.messages().iter().filter(|m| m.is_assistant()).collect();
    assert_eq!(assistants.len(), assistants_before + 1);
    assert_eq!(assistants.last().unwrap().content, APOLOGY_TEXT);
    assert!(!state.loading);
}

#[tokio::test]
async fn missing_or_malformed_reply_uses_fallback() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;

    backend.configure(|inner| inner.reply = Some(None));
    let commands = state.send_message("first");
    state.drive(&backend, commands).await;
    assert_eq!(state.messages().last().unwrap().content, MISSING_CONTENT_TEXT);

    backend.configure(|inner| {
        inner.reply = Some(Some(RawMessage {
            role: None,
            ..raw("assistant", "partial answer", "chat")
        }))
    });
    let commands = state.send_message("second");
    state.drive(&backend, commands).await;
    let last = state.messages().last().unwrap();
    assert_eq!(last.content, "partial answer");
    assert_eq!(last.role, Role::Assistant);
}

#[tokio::test]
async fn reply_for_previous_session_is_not_shown() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let send = state.send_message("question for a");
    let switch = state.select_session("b");
    state.drive(&backend, switch).await;
    let event = execute(&backend, send[0].clone()).await;
    state.apply(event);

    assert!(!state.loading);
    assert_eq!(contents(&state), ["hello from b"]);
}

#[tokio::test]
async fn first_message_names_a_default_titled_session() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;

    let long = "Summarize chapter three of this report for me, with key points";
    let commands = state.send_message(long);
    state.drive(&backend, commands).await;
    let title = state.current_session().unwrap().title.clone();
    assert_eq!(title, long.chars().take(40).collect::<String>().trim_end());

    let commands = state.send_message("another question");
    state.drive(&backend, commands).await;
    assert_eq!(state.current_session().unwrap().title, title);
}

#[tokio::test]
async fn generation_requires_uploaded_pdf() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;

    assert!(state.generate_qa().is_empty());
    assert!(state.generate_quiz(QuizParams::default()).is_empty());
    assert!(state.conduct_research("summary").is_empty());
    let notices = state.take_notices();
    assert_eq!(notices.len(), 3);
    assert!(notices.iter().all(|n| n.text == NEED_PDF_TEXT));
    assert!(!state.generating);
}

#[tokio::test]
async fn generation_switches_feature_and_repolls() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    let commands = state.upload_pdf(Path::new("report.pdf"));
    state.drive(&backend, commands).await;

    let commands = state.generate_qa();
    assert!(state.generating);
    let event = execute(&backend, commands[0].clone()).await;
    let follow_up = state.apply(event);

    assert!(!state.generating);
    assert_eq!(state.current_feature(), FeatureTag::QaGeneration);
    match &follow_up[..] {
        [ChatCommand::LoadMessages { ticket, delay }] => {
            assert_eq!(ticket.feature, FeatureTag::QaGeneration);
            assert_eq!(*delay, state.settings().repoll_delay);
        }
        other => panic!("unexpected follow-up: {other:?}"),
    }
    state.drive(&backend, follow_up).await;
    assert_eq!(contents(&state), ["Q: why? A: because."]);
}

#[tokio::test]
async fn repoll_is_dropped_when_selection_moves() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;
    let commands = state.upload_pdf(Path::new("report.pdf"));
    state.drive(&backend, commands).await;

    let commands = state.generate_questions(QuestionParams::default());
    let event = execute(&backend, commands[0].clone()).await;
    let repoll = state.apply(event);
    let switch = state.set_feature(FeatureTag::Chat);
    state.drive(&backend, switch).await;
    let stale = execute(&backend, repoll[0].clone()).await;
    state.apply(stale);

    assert_eq!(state.current_feature(), FeatureTag::Chat);
    assert!(state
        .messages()
        .iter()
        .all(|m| m.feature_type == "chat" || m.feature_type == "system"));
}

#[tokio::test]
async fn models_fall_back_to_first_offered() {
    let backend = FakeBackend::default();
    backend.configure(|inner| {
        inner.models = vec![ModelDescriptor {
            id: "gpt-4o".into(),
            name: "GPT-4o".into(),
            provider: Some("openai".into()),
            free: None,
        }];
    });
    let mut state = test_state();
    assert_eq!(state.selected_model(), DEFAULT_MODEL);

    let commands = state.load_models();
    state.drive(&backend, commands).await;

    assert_eq!(state.selected_model(), "gpt-4o");
    assert!(!state.select_model("nope"));
    assert!(state.select_model("GPT-4o"));
}

#[tokio::test]
async fn unauthorized_routes_to_login() {
    let backend = FakeBackend::default();
    backend.configure(|inner| inner.unauthorized = true);
    let mut state = test_state();
    state.view = View::Chat;

    let commands = state.load_sessions();
    state.drive(&backend, commands).await;

    assert_eq!(state.view, View::Login);
    assert!(state.sessions().is_empty());
}

#[tokio::test]
async fn blank_search_is_a_noop() {
    let mut state = test_state();
    assert!(state.search("  ", SearchKind::All, 10).is_empty());

    let backend = FakeBackend::default();
    let commands = state.search("report", SearchKind::All, 10);
    state.drive(&backend, commands).await;
    assert!(state.search_results().is_empty());
    assert_eq!(state.take_notices()[0].kind, NoticeKind::Info);
}

#[tokio::test]
async fn successful_fix_refreshes_health() {
    let backend = FakeBackend::default();
    let mut state = test_state();

    let commands = state.fix_issue("cache", true);
    state.drive(&backend, commands).await;

    assert!(state.health().is_some());
    assert_eq!(backend.calls(), ["fix_issue cache", "system_health"]);
    assert_eq!(state.take_notices()[0].text, "Cache cleared");
}

#[tokio::test]
async fn sent_message_survives_a_load_that_lands_after_it() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let load = state.select_session("b");
    let send = state.send_message("What is this about?");
    let loaded = execute(&backend, load[0].clone()).await;
    let replied = execute(&backend, send[0].clone()).await;

    state.apply(loaded);
    assert_eq!(contents(&state), ["hello from b", "What is this about?"]);

    state.apply(replied);
    assert_eq!(
        contents(&state),
        ["hello from b", "What is this about?", "About: What is this about?"]
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn reply_before_pending_load_keeps_both_messages() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let load = state.select_session("b");
    let send = state.send_message("Summarize it");
    let loaded = execute(&backend, load[0].clone()).await;
    let replied = execute(&backend, send[0].clone()).await;

    state.apply(replied);
    state.apply(loaded);
    assert_eq!(
        contents(&state),
        ["hello from b", "Summarize it", "About: Summarize it"]
    );
}

#[tokio::test]
async fn fresh_load_does_not_duplicate_earlier_local_messages() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;

    let commands = state.send_message("Question one");
    state.drive(&backend, commands).await;
    let commands = state.load_messages();
    state.drive(&backend, commands).await;

    assert_eq!(
        contents(&state),
        ["hello from a", "Question one", "About: Question one"]
    );
}

#[tokio::test]
async fn upload_notice_lands_while_messages_are_loading() {
    let backend = FakeBackend::with_sessions(&["a", "b"]);
    let mut state = loaded_state(&backend).await;

    let load = state.select_session("b");
    let upload = state.upload_pdf(Path::new("paper.pdf"));
    let loaded = execute(&backend, load[0].clone()).await;
    let uploaded = execute(&backend, upload[0].clone()).await;

    state.apply(uploaded);
    state.apply(loaded);
    let roles: Vec<Role> = state.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::System]);
    assert!(state.messages()[1].content.contains("\"paper.pdf\""));
}

#[tokio::test]
async fn upload_in_feature_thread_becomes_a_notice() {
    let backend = FakeBackend::with_sessions(&["a"]);
    let mut state = loaded_state(&backend).await;
    let commands = state.set_feature(FeatureTag::Research);
    state.drive(&backend, commands).await;
    state.take_notices();

    let commands = state.upload_pdf(Path::new("paper.pdf"));
    state.drive(&backend, commands).await;

    assert!(state.messages().iter().all(|m| m.role != Role::System));
    let notices = state.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Info);
    assert!(notices[0].text.contains("\"paper.pdf\""));
    assert_eq!(
        state.current_session().unwrap().pdf_filename.as_deref(),
        Some("paper.pdf")
    );
}

#[tokio::test]
async fn search_events_can_be_logged() {
    let backend = FakeBackend::default();
    let event = execute(
        &backend,
        ChatCommand::Search {
            query: "attention".to_string(),
            kind: SearchKind::All,
            limit: 5,
        },
    )
    .await;
    let rendered = format!("{event:?}");
    assert!(rendered.contains("SearchFinished"));
    assert!(rendered.contains("attention"));
}
