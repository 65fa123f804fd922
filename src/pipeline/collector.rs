use serde_json::Value;
use tracing::debug;

use super::IntentPipeline;
use crate::error::{IntentError, IntentResult};
use crate::intent::{force_profile, merge_with_template};
use crate::llm::{prompts, ChatRequest, CollectorResponse, MissingParameter, Stage};
use crate::profile::Profile;

/// Normalized output of the parameter-collection stage.
#[derive(Debug, Clone)]
pub(crate) struct Collection {
    pub intent: Value,
    pub missing: Vec<MissingParameter>,
    pub default_intent: Option<Value>,
    pub defaults_overview: Option<Value>,
    pub summary_hint: String,
}

impl IntentPipeline {
    /// Map free text onto `template`. Any generation failure aborts the request.
    pub(crate) async fn collect(
        &self,
        profile: &Profile,
        template: &Value,
        user_request: &str,
        model: Option<&str>,
    ) -> IntentResult<Collection> {
        let endpoint = self.presets.collector(model);
        let request = ChatRequest::new(
            Stage::Collector,
            endpoint,
            prompts::collector_messages(user_request, template),
        )
        .forcing_json();

        let raw = self.call(request).await.map_err(IntentError::Collector)?;
        let response = CollectorResponse::try_from(raw).map_err(IntentError::Collector)?;

        let mut intent = merge_with_template(template, response.intent.as_ref().unwrap_or(&Value::Null));
        force_profile(&mut intent, &profile.profile_identifier);

        let default_intent = response.default_intent.map(|defaults| {
            let mut merged = merge_with_template(template, &defaults);
            force_profile(&mut merged, &profile.profile_identifier);
            merged
        });

        debug!(
            profile = %profile.slug,
            missing = response.missing_parameters.len(),
            "parameters collected"
        );

        Ok(Collection {
            intent,
            missing: response.missing_parameters,
            default_intent,
            defaults_overview: response.defaults_overview,
            summary_hint: response.summary,
        })
    }
}
