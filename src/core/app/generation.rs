use super::{ChatCommand, ChatState, NEED_PDF_TEXT};
use crate::api::error::ApiError;
use crate::core::backend::{QuestionParams, QuizParams};
use crate::core::message::{FeatureTag, Notice};

/// A server-side generation job tied to the session's PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Questions(QuestionParams),
    Quiz(QuizParams),
    Qa,
    Research { research_type: String },
}

impl GenerationRequest {
    /// Sub-thread the generated messages are filed under.
    pub fn feature(&self) -> FeatureTag {
        match self {
            GenerationRequest::Questions(_) => FeatureTag::QuestionGeneration,
            GenerationRequest::Quiz(_) => FeatureTag::QuizGeneration,
            GenerationRequest::Qa => FeatureTag::QaGeneration,
            GenerationRequest::Research { .. } => FeatureTag::Research,
        }
    }

    fn failure_label(&self) -> &'static str {
        match self {
            GenerationRequest::Questions(_) => "Error generating questions",
            GenerationRequest::Quiz(_) => "Error generating quiz",
            GenerationRequest::Qa => "Error generating Q&A",
            GenerationRequest::Research { .. } => "Error conducting research",
        }
    }
}

impl ChatState {
    pub fn generate_questions(&mut self, params: QuestionParams) -> Vec<ChatCommand> {
        self.start_generation(GenerationRequest::Questions(params))
    }

    pub fn generate_quiz(&mut self, params: QuizParams) -> Vec<ChatCommand> {
        self.start_generation(GenerationRequest::Quiz(params))
    }

    pub fn generate_qa(&mut self) -> Vec<ChatCommand> {
        self.start_generation(GenerationRequest::Qa)
    }

    pub fn conduct_research(&mut self, research_type: &str) -> Vec<ChatCommand> {
        let research_type = match research_type.trim() {
            "" => "summary",
            other => other,
        };
        self.start_generation(GenerationRequest::Research {
            research_type: research_type.to_string(),
        })
    }

    fn start_generation(&mut self, request: GenerationRequest) -> Vec<ChatCommand> {
        let Some(session) = self.current_session().filter(|session| session.has_pdf()) else {
            self.push_notice(Notice::error(NEED_PDF_TEXT));
            return Vec::new();
        };
        if self.generating {
            return Vec::new();
        }
        let session_id = session.id.clone();
        self.generating = true;
        vec![ChatCommand::Generate {
            session_id,
            model: self.selected_model.clone(),
            request,
        }]
    }

    /// On success the view moves to the generated sub-thread and messages
    /// are re-polled after a short delay, since the backend may still be
    /// writing them when the trigger returns.
    pub(super) fn finish_generation(
        &mut self,
        session_id: &str,
        request: &GenerationRequest,
        result: Result<(), ApiError>,
    ) -> Vec<ChatCommand> {
        self.generating = false;
        if let Err(err) = result {
            self.fail(request.failure_label(), &err);
            return Vec::new();
        }

        if self.current_session_id.as_deref() != Some(session_id) {
            tracing::debug!(session = %session_id, "generation finished for a background session");
            return Vec::new();
        }
        let feature = request.feature();
        if self.current_feature != feature {
            self.current_feature = feature;
            self.messages.clear();
        }
        self.load_messages_after(self.settings.repoll_delay)
    }
}
