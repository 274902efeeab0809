use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::{extract_error_detail, ApiError};
use super::{
    AuthResponse, AuthUser, CreateSessionRequest, Credentials, FixRequest, FixResponse,
    GenerateQaRequest, GenerateQuestionsRequest, GenerateQuizRequest, HealthReport,
    ModelDescriptor, ModelsResponse, ResearchRequest, SearchKind, SearchRequest, SearchResponse,
    SendMessageRequest, SendMessageResponse, Session, UploadResponse,
};
use crate::auth::SharedTokenStore;
use crate::core::backend::{Backend, QuestionParams, QuizParams};
use crate::core::message::{FeatureTag, RawMessage};
use crate::utils::url::{api_base_url, construct_api_url};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Preconfigured HTTP client for the ChatPDF backend.
///
/// All paths are resolved against `<origin>/api`. When a token store is
/// attached, its token is sent as a bearer credential; a 401 response clears
/// it.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Option<SharedTokenStore>,
}

impl ApiClient {
    pub fn new(backend_origin: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self {
            http,
            base_url: api_base_url(backend_origin),
            tokens: None,
        })
    }

    pub fn with_token_store(mut self, store: SharedTokenStore) -> Self {
        self.tokens = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> Option<&SharedTokenStore> {
        self.tokens.as_ref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = construct_api_url(&self.base_url, path);
        tracing::debug!(%method, %url, "backend request");
        let builder = self.http.request(method, url);
        match self.tokens.as_ref().and_then(|store| store.get()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_error_detail(&body);
        tracing::debug!(%status, detail = ?detail, "backend returned an error status");

        if status == StatusCode::UNAUTHORIZED {
            if let Some(store) = &self.tokens {
                if let Err(err) = store.clear() {
                    tracing::warn!(error = %err, "failed to clear rejected access token");
                }
            }
            return Err(ApiError::Unauthorized { detail });
        }

        Err(ApiError::Status { status, detail })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(ApiError::from_reqwest)
    }

    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await.map(|_| ())
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.send_json(self.request(Method::GET, "sessions")).await
    }

    async fn create_session(&self, title: &str) -> Result<Session, ApiError> {
        let body = CreateSessionRequest { title };
        self.send_json(self.request(Method::POST, "sessions").json(&body))
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let path = format!("sessions/{session_id}");
        self.send_unit(self.request(Method::DELETE, &path)).await
    }

    async fn list_messages(
        &self,
        session_id: &str,
        feature: FeatureTag,
    ) -> Result<Vec<RawMessage>, ApiError> {
        let path = format!("sessions/{session_id}/messages");
        let mut builder = self.request(Method::GET, &path);
        if let Some(filter) = feature.as_filter() {
            builder = builder.query(&[("feature_type", filter)]);
        }
        let items: Option<Vec<RawMessage>> = self.send_json(builder).await?;
        Ok(items.unwrap_or_default())
    }

    async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        model: &str,
        feature: FeatureTag,
    ) -> Result<Option<RawMessage>, ApiError> {
        let path = format!("sessions/{session_id}/messages");
        let body = SendMessageRequest {
            session_id,
            content,
            model,
            feature_type: feature.as_str(),
        };
        let response: SendMessageResponse = self
            .send_json(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(response.ai_response)
    }

    async fn upload_pdf(&self, session_id: &str, path: &Path) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/pdf")
            .map_err(ApiError::from_reqwest)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let endpoint = format!("sessions/{session_id}/upload-pdf");
        let response: UploadResponse = self
            .send_json(self.request(Method::POST, &endpoint).multipart(form))
            .await?;
        Ok(response.filename)
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ApiError> {
        let response: ModelsResponse = self.send_json(self.request(Method::GET, "models")).await?;
        Ok(response.models)
    }

    async fn generate_questions(
        &self,
        session_id: &str,
        model: &str,
        params: &QuestionParams,
    ) -> Result<(), ApiError> {
        let body = GenerateQuestionsRequest {
            session_id,
            question_type: &params.question_type,
            chapter_segment: params.chapter_segment.as_deref(),
            model,
        };
        self.send_unit(self.request(Method::POST, "generate-questions").json(&body))
            .await
    }

    async fn generate_quiz(
        &self,
        session_id: &str,
        model: &str,
        params: &QuizParams,
    ) -> Result<(), ApiError> {
        let body = GenerateQuizRequest {
            session_id,
            quiz_type: &params.quiz_type,
            difficulty: &params.difficulty,
            question_count: params.question_count,
            model,
        };
        self.send_unit(self.request(Method::POST, "generate-quiz").json(&body))
            .await
    }

    async fn generate_qa(&self, session_id: &str, model: &str) -> Result<(), ApiError> {
        let path = format!("sessions/{session_id}/generate-qa");
        let body = GenerateQaRequest { session_id, model };
        self.send_unit(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn conduct_research(
        &self,
        session_id: &str,
        model: &str,
        research_type: &str,
    ) -> Result<(), ApiError> {
        let path = format!("sessions/{session_id}/research");
        let body = ResearchRequest {
            session_id,
            research_type,
            model,
        };
        self.send_unit(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: u32,
    ) -> Result<SearchResponse, ApiError> {
        let body = SearchRequest {
            query,
            search_type: kind,
            limit,
        };
        self.send_json(self.request(Method::POST, "search").json(&body))
            .await
    }

    async fn system_health(&self) -> Result<HealthReport, ApiError> {
        self.send_json(self.request(Method::GET, "system-health"))
            .await
    }

    async fn fix_issue(&self, issue_id: &str, confirm: bool) -> Result<FixResponse, ApiError> {
        let body = FixRequest {
            issue_id,
            confirm_fix: confirm,
        };
        self.send_json(self.request(Method::POST, "system-health/fix").json(&body))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = Credentials { email, password };
        self.send_json(self.request(Method::POST, "auth/login").json(&body))
            .await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = Credentials { email, password };
        self.send_json(self.request(Method::POST, "auth/register").json(&body))
            .await
    }

    async fn current_user(&self) -> Result<AuthUser, ApiError> {
        self.send_json(self.request(Method::GET, "auth/me")).await
    }
}
