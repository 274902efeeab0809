//! Wire types for the ChatPDF backend REST API and the HTTP client that
//! speaks it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::RawMessage;

pub mod client;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind};

pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Session {
    pub fn has_pdf(&self) -> bool {
        self.pdf_filename
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

#[derive(Serialize)]
pub struct CreateSessionRequest<'a> {
    pub title: &'a str,
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub session_id: &'a str,
    pub content: &'a str,
    pub model: &'a str,
    pub feature_type: &'a str,
}

#[derive(Deserialize, Default)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub ai_response: Option<RawMessage>,
}

#[derive(Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub free: Option<bool>,
}

#[derive(Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

#[derive(Serialize)]
pub struct GenerateQuestionsRequest<'a> {
    pub session_id: &'a str,
    pub question_type: &'a str,
    pub chapter_segment: Option<&'a str>,
    pub model: &'a str,
}

#[derive(Serialize)]
pub struct GenerateQuizRequest<'a> {
    pub session_id: &'a str,
    pub quiz_type: &'a str,
    pub difficulty: &'a str,
    pub question_count: u32,
    pub model: &'a str,
}

#[derive(Serialize)]
pub struct GenerateQaRequest<'a> {
    pub session_id: &'a str,
    pub model: &'a str,
}

#[derive(Serialize)]
pub struct ResearchRequest<'a> {
    pub session_id: &'a str,
    pub research_type: &'a str,
    pub model: &'a str,
}

/// Scope of a cross-session search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    All,
    Pdfs,
    Conversations,
}

impl SearchKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(SearchKind::All),
            "pdf" | "pdfs" => Some(SearchKind::Pdfs),
            "conversation" | "conversations" | "chats" => Some(SearchKind::Conversations),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub search_type: SearchKind,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Pdf {
        session_id: Option<String>,
        filename: String,
        snippet: String,
    },
    Conversation {
        session_id: Option<String>,
        session_title: String,
        content: String,
    },
    Other(Value),
}

impl SearchResult {
    fn from_value(value: Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match value.get("type").and_then(Value::as_str) {
            Some("pdf") => SearchResult::Pdf {
                session_id: text("session_id"),
                filename: text("filename").unwrap_or_default(),
                snippet: text("snippet").unwrap_or_default(),
            },
            Some("conversation") => SearchResult::Conversation {
                session_id: text("session_id"),
                session_title: text("session_title").unwrap_or_default(),
                content: text("content").unwrap_or_default(),
            },
            _ => SearchResult::Other(value),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SearchResult::Pdf { session_id, .. } | SearchResult::Conversation { session_id, .. } => {
                session_id.as_deref()
            }
            SearchResult::Other(value) => value.get("session_id").and_then(Value::as_str),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            SearchResult::Pdf {
                filename, snippet, ..
            } => format!("[pdf] {filename}: {snippet}"),
            SearchResult::Conversation {
                session_title,
                content,
                ..
            } => format!("[chat] {session_title}: {content}"),
            SearchResult::Other(value) => format!("[other] {value}"),
        }
    }
}

impl<'de> Deserialize<'de> for SearchResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(SearchResult::from_value)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthMetrics {
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub disk_usage: f64,
    #[serde(default)]
    pub response_time: f64,
    #[serde(default)]
    pub active_sessions: u64,
    #[serde(default)]
    pub total_api_calls: u64,
    #[serde(default)]
    pub error_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthIssue {
    pub id: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, alias = "description")]
    pub message: Option<String>,
    #[serde(default)]
    pub auto_fixable: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub overall_status: OverallStatus,
    #[serde(default)]
    pub backend_status: Option<String>,
    #[serde(default)]
    pub frontend_status: Option<String>,
    #[serde(default)]
    pub database_status: Option<String>,
    #[serde(default)]
    pub api_status: Option<String>,
    #[serde(default)]
    pub last_check: Option<String>,
    #[serde(default)]
    pub metrics: HealthMetrics,
    #[serde(default)]
    pub issues: Vec<HealthIssue>,
    #[serde(default)]
    pub uptime: f64,
}

#[derive(Serialize)]
pub struct FixRequest<'a> {
    pub issue_id: &'a str,
    pub confirm_fix: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixResponse {
    #[serde(default)]
    pub confirmed: Option<bool>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: AuthUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_decode_by_type() {
        let json = r#"{
            "query": "test",
            "search_type": "all",
            "total_results": 3,
            "results": [
                {"type": "pdf", "session_id": "s1", "filename": "a.pdf", "snippet": "...test..."},
                {"type": "conversation", "session_id": "s2", "session_title": "Chat", "content": "a test"},
                {"type": "annotation", "text": "x"}
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total_results, Some(3));
        assert!(matches!(response.results[0], SearchResult::Pdf { .. }));
        assert_eq!(response.results[1].session_id(), Some("s2"));
        assert!(matches!(response.results[2], SearchResult::Other(_)));
    }

    #[test]
    fn session_has_pdf_ignores_blank_filenames() {
        let mut session = Session {
            id: "s".into(),
            title: "t".into(),
            pdf_filename: Some("  ".into()),
            created_at: None,
            updated_at: None,
        };
        assert!(!session.has_pdf());
        session.pdf_filename = Some("report.pdf".into());
        assert!(session.has_pdf());
    }

    #[test]
    fn health_report_tolerates_missing_optional_sections() {
        let json = r#"{"overall_status": "warning", "issues": [{"id": "i1", "description": "disk"}]}"#;
        let report: HealthReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.overall_status, OverallStatus::Warning);
        assert_eq!(report.issues[0].message.as_deref(), Some("disk"));
        assert_eq!(report.metrics.active_sessions, 0);
    }

    #[test]
    fn search_kind_parses_user_input() {
        assert_eq!(SearchKind::parse("PDFs"), Some(SearchKind::Pdfs));
        assert_eq!(SearchKind::parse("chats"), Some(SearchKind::Conversations));
        assert_eq!(SearchKind::parse("x"), None);
    }
}
