use std::path::PathBuf;
use std::time::Duration;

use super::generation::GenerationRequest;
use super::SelectionTicket;
use crate::api::error::{retry_transient, ApiError};
use crate::api::{FixResponse, HealthReport, ModelDescriptor, SearchKind, SearchResponse, Session};
use crate::core::backend::Backend;
use crate::core::message::{FeatureTag, RawMessage};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Work the state machine wants done against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    LoadSessions {
        attempts: u32,
    },
    CreateSession {
        title: String,
    },
    DeleteSession {
        session_id: String,
    },
    LoadMessages {
        ticket: SelectionTicket,
        delay: Duration,
    },
    SendMessage {
        session_id: String,
        content: String,
        model: String,
        feature: FeatureTag,
    },
    UploadPdf {
        session_id: String,
        path: PathBuf,
    },
    Generate {
        session_id: String,
        model: String,
        request: GenerationRequest,
    },
    LoadModels {
        attempts: u32,
    },
    Search {
        query: String,
        kind: SearchKind,
        limit: u32,
    },
    CheckHealth,
    FixIssue {
        issue_id: String,
        confirm: bool,
    },
}

/// Outcome of a [`ChatCommand`], carrying enough context to decide whether
/// it still applies.
#[derive(Debug)]
pub enum ChatEvent {
    SessionsLoaded(Result<Vec<Session>, ApiError>),
    SessionCreated(Result<Session, ApiError>),
    SessionDeleted {
        session_id: String,
        result: Result<(), ApiError>,
    },
    MessagesLoaded {
        ticket: SelectionTicket,
        result: Result<Vec<RawMessage>, ApiError>,
    },
    MessageSent {
        session_id: String,
        feature: FeatureTag,
        prompt: String,
        result: Result<Option<RawMessage>, ApiError>,
    },
    PdfUploaded {
        session_id: String,
        result: Result<String, ApiError>,
    },
    GenerationFinished {
        session_id: String,
        request: GenerationRequest,
        result: Result<(), ApiError>,
    },
    ModelsLoaded(Result<Vec<ModelDescriptor>, ApiError>),
    SearchFinished {
        query: String,
        result: Result<SearchResponse, ApiError>,
    },
    HealthChecked(Result<HealthReport, ApiError>),
    IssueFixed {
        issue_id: String,
        result: Result<FixResponse, ApiError>,
    },
}

/// Perform one command. Never panics on backend failure; errors travel back
/// inside the event.
pub async fn execute(backend: &dyn Backend, command: ChatCommand) -> ChatEvent {
    match command {
        ChatCommand::LoadSessions { attempts } => ChatEvent::SessionsLoaded(
            retry_transient(attempts, RETRY_BASE_DELAY, || backend.list_sessions()).await,
        ),
        ChatCommand::CreateSession { title } => {
            ChatEvent::SessionCreated(backend.create_session(&title).await)
        }
        ChatCommand::DeleteSession { session_id } => {
            let result = backend.delete_session(&session_id).await;
            ChatEvent::SessionDeleted { session_id, result }
        }
        ChatCommand::LoadMessages { ticket, delay } => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = backend
                .list_messages(&ticket.session_id, ticket.feature)
                .await;
            ChatEvent::MessagesLoaded { ticket, result }
        }
        ChatCommand::SendMessage {
            session_id,
            content,
            model,
            feature,
        } => {
            let result = backend
                .send_message(&session_id, &content, &model, feature)
                .await;
            ChatEvent::MessageSent {
                session_id,
                feature,
                prompt: content,
                result,
            }
        }
        ChatCommand::UploadPdf { session_id, path } => {
            let result = backend.upload_pdf(&session_id, &path).await;
            ChatEvent::PdfUploaded { session_id, result }
        }
        ChatCommand::Generate {
            session_id,
            model,
            request,
        } => {
            let result = match &request {
                GenerationRequest::Questions(params) => {
                    backend.generate_questions(&session_id, &model, params).await
                }
                GenerationRequest::Quiz(params) => {
                    backend.generate_quiz(&session_id, &model, params).await
                }
                GenerationRequest::Qa => backend.generate_qa(&session_id, &model).await,
                GenerationRequest::Research { research_type } => {
                    backend
                        .conduct_research(&session_id, &model, research_type)
                        .await
                }
            };
            ChatEvent::GenerationFinished {
                session_id,
                request,
                result,
            }
        }
        ChatCommand::LoadModels { attempts } => ChatEvent::ModelsLoaded(
            retry_transient(attempts, RETRY_BASE_DELAY, || backend.list_models()).await,
        ),
        ChatCommand::Search { query, kind, limit } => {
            let result = backend.search(&query, kind, limit).await;
            ChatEvent::SearchFinished { query, result }
        }
        ChatCommand::CheckHealth => ChatEvent::HealthChecked(backend.system_health().await),
        ChatCommand::FixIssue { issue_id, confirm } => {
            let result = backend.fix_issue(&issue_id, confirm).await;
            ChatEvent::IssueFixed { issue_id, result }
        }
    }
}
