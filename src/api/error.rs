use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

pub const NETWORK_ERROR: &str =
    "Unable to connect to the server. Please check your connection and try again.";
pub const SERVER_ERROR: &str =
    "The server is currently experiencing issues. Please try again in a few moments.";
pub const NOT_FOUND: &str = "The requested resource could not be found.";
pub const UNAUTHORIZED: &str = "Your session has expired. Please log in again.";
pub const FORBIDDEN: &str = "You do not have permission to perform this action.";
pub const VALIDATION_ERROR: &str = "Please check your input and try again.";
pub const FILE_TOO_LARGE: &str = "The file is too large. Please select a smaller file.";
pub const UNSUPPORTED_FILE: &str = "This file type is not supported. Please select a PDF file.";
pub const PDF_PROCESSING_ERROR: &str =
    "There was an error processing your PDF. Please try with a different file.";
pub const AI_SERVICE_ERROR: &str =
    "The AI service is currently unavailable. Please try again later.";
pub const RATE_LIMIT: &str = "Too many requests. Please wait a moment before trying again.";
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// Coarse classification used to pick user-facing text and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Server,
    Client,
    Auth,
    Validation,
    Unknown,
}

/// Failures surfaced by [`crate::api::ApiClient`].
#[derive(Debug)]
pub enum ApiError {
    /// The connection could not be established or was dropped.
    Network(reqwest::Error),
    /// The request exceeded the client-side timeout.
    Timeout,
    /// The backend rejected the bearer token (HTTP 401). The stored token
    /// has already been cleared when this is returned.
    Unauthorized { detail: Option<String> },
    /// Any other non-success HTTP status.
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    /// The response body did not match the expected shape.
    Decode(String),
    /// A local resource (such as the file being uploaded) could not be read.
    Io(std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail } | ApiError::Status { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) | ApiError::Timeout => ErrorKind::Network,
            ApiError::Unauthorized { .. } => ErrorKind::Auth,
            ApiError::Status { status, .. } => match status.as_u16() {
                403 => ErrorKind::Auth,
                400 | 413 | 415 | 422 => ErrorKind::Validation,
                404 | 429 => ErrorKind::Client,
                500..=599 => ErrorKind::Server,
                _ => ErrorKind::Unknown,
            },
            ApiError::Decode(_) => ErrorKind::Server,
            ApiError::Io(_) => ErrorKind::Client,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }

    /// Text suitable for showing to the user in place of the raw error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) | ApiError::Timeout => NETWORK_ERROR.to_string(),
            ApiError::Unauthorized { .. } => UNAUTHORIZED.to_string(),
            ApiError::Decode(_) => SERVER_ERROR.to_string(),
            ApiError::Io(err) => err.to_string(),
            ApiError::Status { status, detail } => {
                let detail = detail.as_deref().filter(|d| !d.trim().is_empty());
                match status.as_u16() {
                    400 | 422 => detail.unwrap_or(VALIDATION_ERROR).to_string(),
                    403 => FORBIDDEN.to_string(),
                    404 => NOT_FOUND.to_string(),
                    413 => FILE_TOO_LARGE.to_string(),
                    415 => UNSUPPORTED_FILE.to_string(),
                    429 => RATE_LIMIT.to_string(),
                    500 => match detail {
                        Some(d) if d.contains("AI service error") || d.contains("API key") => {
                            AI_SERVICE_ERROR.to_string()
                        }
                        Some(d) if d.contains("PDF") => PDF_PROCESSING_ERROR.to_string(),
                        _ => SERVER_ERROR.to_string(),
                    },
                    502..=504 => SERVER_ERROR.to_string(),
                    _ => GENERIC_ERROR.to_string(),
                }
            }
        }
    }

    /// Message in the form "<what failed>: <why>", preferring the backend's
    /// own `detail` text when it sent one.
    pub fn describe(&self, action: &str) -> String {
        match self.detail().filter(|d| !d.trim().is_empty()) {
            Some(detail) => format!("{action}: {detail}"),
            None => format!("{action}: {}", self.user_message()),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err)
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(err) => write!(f, "network error: {err}"),
            ApiError::Timeout => write!(f, "request timed out"),
            ApiError::Unauthorized { detail } => match detail {
                Some(detail) => write!(f, "unauthorized: {detail}"),
                None => write!(f, "unauthorized"),
            },
            ApiError::Status { status, detail } => match detail {
                Some(detail) => write!(f, "request failed with status {status}: {detail}"),
                None => write!(f, "request failed with status {status}"),
            },
            ApiError::Decode(msg) => write!(f, "unexpected response body: {msg}"),
            ApiError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Network(err) => Some(err),
            ApiError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err)
    }
}

/// Pull a human-readable summary out of an error body. FastAPI style
/// `{"detail": "..."}` is the common case; `{"error": {"message": ...}}`
/// and `{"message": ...}` are also understood.
pub fn extract_error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.chars().take(300).collect());
    };

    let summary = match value.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        // Validation errors arrive as a list of {loc, msg, type}.
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
    .or_else(|| {
        value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    })
    .or_else(|| value.get("error").and_then(|v| v.as_str()).map(str::to_owned))
    .or_else(|| {
        value
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Run `op` up to `attempts` times, retrying only transient failures with a
/// linearly growing delay.
pub async fn retry_transient<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && err.is_transient() => {
                tracing::debug!(attempt, error = %err, "retrying transient failure");
                tokio::time::sleep(base_delay * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
