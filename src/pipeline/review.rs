use serde_json::Value;

use super::IntentPipeline;
use crate::error::LlmError;
use crate::llm::{prompts, ChatRequest, ReviewerResponse, Stage};

impl IntentPipeline {
    /// Physics/expert review of a schema-valid intent.
    ///
    /// Errors are returned to the caller, which degrades them to
    /// `reasoner_failed` instead of failing the request.
    pub(crate) async fn review(
        &self,
        intent: &Value,
        schema: &Value,
    ) -> Result<ReviewerResponse, LlmError> {
        let request = ChatRequest::new(
            Stage::Reviewer,
            self.presets.reviewer(),
            prompts::reviewer_messages(intent, schema),
        )
        .forcing_json();

        let raw = self.call(request).await?;
        ReviewerResponse::try_from(raw)
    }
}
