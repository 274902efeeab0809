use std::path::Path;

use async_trait::async_trait;

use crate::api::{
    ApiError, AuthResponse, AuthUser, FixResponse, HealthReport, ModelDescriptor, SearchKind,
    SearchResponse, Session,
};
use crate::core::message::{FeatureTag, RawMessage};

/// Parameters for `/generate-questions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionParams {
    /// One of `faq`, `mcq`, `true_false`, `mixed`.
    pub question_type: String,
    pub chapter_segment: Option<String>,
}

impl Default for QuestionParams {
    fn default() -> Self {
        Self {
            question_type: "mixed".to_string(),
            chapter_segment: None,
        }
    }
}

/// Parameters for `/generate-quiz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizParams {
    pub quiz_type: String,
    pub difficulty: String,
    pub question_count: u32,
}

impl Default for QuizParams {
    fn default() -> Self {
        Self {
            quiz_type: "daily".to_string(),
            difficulty: "medium".to_string(),
            question_count: 10,
        }
    }
}

/// Everything the chat state machine needs from the remote service.
///
/// [`crate::api::ApiClient`] is the production implementation; tests plug in
/// an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;

    async fn create_session(&self, title: &str) -> Result<Session, ApiError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError>;

    async fn list_messages(
        &self,
        session_id: &str,
        feature: FeatureTag,
    ) -> Result<Vec<RawMessage>, ApiError>;

    /// Returns the backend's `ai_response`, which may be absent or malformed.
    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        model: &str,
        feature: FeatureTag,
    ) -> Result<Option<RawMessage>, ApiError>;

    /// Uploads the file and returns the filename the backend recorded.
    async fn upload_pdf(&self, session_id: &str, path: &Path) -> Result<String, ApiError>;

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ApiError>;

    async fn generate_questions(
        &self,
        session_id: &str,
        model: &str,
        params: &QuestionParams,
    ) -> Result<(), ApiError>;

    async fn generate_quiz(
        &self,
        session_id: &str,
        model: &str,
        params: &QuizParams,
    ) -> Result<(), ApiError>;

    async fn generate_qa(&self, session_id: &str, model: &str) -> Result<(), ApiError>;

    async fn conduct_research(
        &self,
        session_id: &str,
        model: &str,
        research_type: &str,
    ) -> Result<(), ApiError>;

    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<SearchResponse, ApiError>;

    async fn system_health(&self) -> Result<HealthReport, ApiError>;

    async fn fix_issue(&self, issue_id: &str, confirm: bool) -> Result<FixResponse, ApiError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError>;

    async fn current_user(&self) -> Result<AuthUser, ApiError>;
}
