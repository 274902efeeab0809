use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Selects which sub-thread of a session is shown and which actions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureTag {
    #[default]
    Chat,
    QuestionGeneration,
    QaGeneration,
    GeneralAi,
    Research,
    Translation,
    Comparison,
    Annotations,
    QuizGeneration,
}

impl FeatureTag {
    pub const ALL: [FeatureTag; 9] = [
        FeatureTag::Chat,
        FeatureTag::QuestionGeneration,
        FeatureTag::QaGeneration,
        FeatureTag::GeneralAi,
        FeatureTag::Research,
        FeatureTag::Translation,
        FeatureTag::Comparison,
        FeatureTag::Annotations,
        FeatureTag::QuizGeneration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureTag::Chat => "chat",
            FeatureTag::QuestionGeneration => "question_generation",
            FeatureTag::QaGeneration => "qa_generation",
            FeatureTag::GeneralAi => "general_ai",
            FeatureTag::Research => "research",
            FeatureTag::Translation => "translation",
            FeatureTag::Comparison => "comparison",
            FeatureTag::Annotations => "annotations",
            FeatureTag::QuizGeneration => "quiz_generation",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            FeatureTag::Chat => "PDF Chat",
            FeatureTag::QuestionGeneration => "Question Generator",
            FeatureTag::QaGeneration => "Auto Q&A",
            FeatureTag::GeneralAi => "General AI",
            FeatureTag::Research => "Research & Summary",
            FeatureTag::Translation => "Translation",
            FeatureTag::Comparison => "Comparison",
            FeatureTag::Annotations => "Annotations",
            FeatureTag::QuizGeneration => "Quiz",
        }
    }

    /// The value sent as `feature_type` when listing messages. The default
    /// chat thread is requested unfiltered.
    pub fn as_filter(self) -> Option<&'static str> {
        match self {
            FeatureTag::Chat => None,
            other => Some(other.as_str()),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let alias = match normalized.as_str() {
            "qa" => "qa_generation",
            "questions" => "question_generation",
            "quiz" => "quiz_generation",
            "general" => "general_ai",
            other => other,
        };
        Self::ALL.iter().copied().find(|tag| tag.as_str() == alias)
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub feature_type: String,
}

impl Message {
    /// Build a message locally with a fresh id and the current time.
    pub fn local(role: Role, content: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
            feature_type: feature_type.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

/// Message as it arrives over the wire. Every field is optional so a
/// malformed item can be inspected and rejected instead of failing the
/// whole list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub feature_type: Option<String>,
}

impl RawMessage {
    /// Returns a renderable message when `role` is a known non-empty role and
    /// `content` is present (the empty string is allowed).
    pub fn validate(self) -> Option<Message> {
        let role = Role::try_from(self.role.as_deref()?.trim()).ok()?;
        let content = self.content?;
        let timestamp = match self.timestamp {
            Some(serde_json::Value::String(s)) => s,
            Some(other) if !other.is_null() => other.to_string(),
            _ => Utc::now().to_rfc3339(),
        };
        Some(Message {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            role,
            content,
            timestamp,
            feature_type: self
                .feature_type
                .unwrap_or_else(|| FeatureTag::Chat.as_str().to_string()),
        })
    }
}

/// Keep the items that pass [`RawMessage::validate`], in order.
pub fn validate_messages(raw: Vec<RawMessage>) -> Vec<Message> {
    let total = raw.len();
    let valid: Vec<Message> = raw.into_iter().filter_map(RawMessage::validate).collect();
    if valid.len() != total {
        tracing::debug!(
            discarded = total - valid.len(),
            "dropped malformed messages from backend payload"
        );
    }
    valid
}

/// Severity for notices shown to the user outside the transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(role: Option<&str>, content: Option<&str>) -> RawMessage {
        RawMessage {
            id: Some("m1".into()),
            role: role.map(str::to_string),
            content: content.map(str::to_string),
            timestamp: Some(serde_json::Value::String("2024-01-01T00:00:00Z".into())),
            feature_type: Some("chat".into()),
        }
    }

    #[test]
    fn empty_content_is_valid_but_missing_content_is_not() {
        assert!(raw(Some("assistant"), Some("")).validate().is_some());
        assert!(raw(Some("assistant"), None).validate().is_none());
    }

    #[test]
    fn empty_or_unknown_role_is_rejected() {
        assert!(raw(Some(""), Some("hi")).validate().is_none());
        assert!(raw(None, Some("hi")).validate().is_none());
        assert!(raw(Some("tool"), Some("hi")).validate().is_none());
    }

    #[test]
    fn validate_messages_preserves_order_of_survivors() {
        let items = vec![
            raw(Some("user"), Some("first")),
            raw(None, Some("broken")),
            raw(Some("assistant"), Some("second")),
        ];
        let valid = validate_messages(items);
        let contents: Vec<_> = valid.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn numeric_timestamps_are_stringified() {
        let mut item = raw(Some("user"), Some("x"));
        item.timestamp = Some(serde_json::json!(1700000000));
        let msg = item.validate().expect("valid");
        assert_eq!(msg.timestamp, "1700000000");
    }

    #[test]
    fn feature_tags_parse_aliases_and_filter_chat() {
        assert_eq!(FeatureTag::parse("qa"), Some(FeatureTag::QaGeneration));
        assert_eq!(FeatureTag::parse("quiz"), Some(FeatureTag::QuizGeneration));
        assert_eq!(
            FeatureTag::parse("general-ai"),
            Some(FeatureTag::GeneralAi)
        );
        assert_eq!(FeatureTag::parse("nope"), None);
        assert_eq!(FeatureTag::Chat.as_filter(), None);
        assert_eq!(FeatureTag::Research.as_filter(), Some("research"));
    }

    #[test]
    fn feature_tag_serializes_snake_case() {
        let json = serde_json::to_string(&FeatureTag::QuizGeneration).unwrap();
        assert_eq!(json, "\"quiz_generation\"");
    }

    #[test]
    fn local_messages_get_unique_ids() {
        let a = Message::local(Role::User, "a", "chat");
        let b = Message::local(Role::User, "a", "chat");
        assert_ne!(a.id, b.id);
    }
}
