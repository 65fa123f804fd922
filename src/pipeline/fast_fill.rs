use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::IntentPipeline;
use crate::error::{IntentError, IntentResult};
use crate::intent::{
    enforce_dimension_mode, force_profile, merge_job_meta, merge_with_template,
    normalize_dimension_mode, prepare_template,
};
use crate::llm::{prompts, ChatRequest, FastFillResponse, Stage};
use crate::profile::DEFAULT_PROFILE_SLUG;

fn default_profile_slug() -> String {
    DEFAULT_PROFILE_SLUG.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FastFillRequest {
    pub user_request: String,
    #[serde(default = "default_profile_slug")]
    pub profile_slug: String,
    /// `3D` or `2D_extruded`; anything else leaves the template's setting alone.
    #[serde(default)]
    pub dimension_mode: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub job_meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FastFillOutcome {
    pub profile_slug: String,
    pub family: String,
    pub intent: Value,
    pub defaults_used: Vec<String>,
    pub open_questions: Vec<String>,
    /// Effective `meshing.blockMesh.geometry.dimension_mode` after enforcement.
    pub dimension_mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl IntentPipeline {
    /// Fill a dimension-prepared template in a single generation call.
    pub async fn fill_fast(&self, request: FastFillRequest) -> IntentResult<FastFillOutcome> {
        let profile = self.registry.require_slug(&request.profile_slug)?;
        let template = profile.load_template()?;
        let mode = normalize_dimension_mode(request.dimension_mode.as_deref());
        let prepared = prepare_template(&template, mode);

        let chat = ChatRequest::new(
            Stage::FastFill,
            self.presets.fast_fill(request.model.as_deref()),
            prompts::fast_fill_messages(profile, &request.user_request, &prepared.intent, mode),
        )
        .forcing_json();
        let raw = self.call(chat).await.map_err(IntentError::FastFill)?;
        let response = FastFillResponse::try_from(raw).map_err(IntentError::FastFill)?;

        let mut intent =
            merge_with_template(&prepared.intent, response.intent.as_ref().unwrap_or(&Value::Null));
        force_profile(&mut intent, &profile.profile_identifier);
        if let Some(job_meta) = &request.job_meta {
            merge_job_meta(&mut intent, job_meta);
        }

        let enforced = enforce_dimension_mode(&intent, mode, &prepared.intent);
        let mut warnings = prepared.warnings;
        warnings.extend(enforced.warnings);

        let dimension_mode = enforced
            .intent
            .pointer("/meshing/blockMesh/geometry/dimension_mode")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(FastFillOutcome {
            profile_slug: profile.slug.clone(),
            family: profile.family.clone(),
            intent: enforced.intent,
            defaults_used: response.defaults_used,
            open_questions: response.open_questions,
            dimension_mode,
            warnings,
        })
    }
}
