use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::collector::Collection;
use super::{IntentPipeline, PipelineStatus, ReviewPayload};
use crate::error::IntentResult;
use crate::intent::{force_profile, merge_with_template};
use crate::llm::MissingParameter;
use crate::profile::Profile;
use crate::schema::validate;
use crate::summary::{build_collection_summary, build_multilayer_summary};

fn default_use_template() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillRequest {
    pub user_request: String,
    pub profile_slug: String,
    #[serde(default = "default_use_template")]
    pub use_template: bool,
    /// Model alias chosen by the caller; only `deepseek*` aliases affect collection.
    #[serde(default)]
    pub model: Option<String>,
    /// Caller-supplied values; when present the collector stage is skipped.
    #[serde(default)]
    pub client_intent: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillOutcome {
    pub profile_slug: String,
    pub family: String,
    pub intent: Value,
    pub human_summary: String,
    pub review: ReviewPayload,
    pub pipeline_status: PipelineStatus,
    pub missing_parameters: Vec<MissingParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_intent: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults_overview: Option<Value>,
}

/// Collector extras carried onto every terminal outcome.
#[derive(Default)]
struct Suggestions {
    default_intent: Option<Value>,
    defaults_overview: Option<Value>,
}

impl IntentPipeline {
    /// Run the full collect -> validate -> review -> re-validate pipeline.
    ///
    /// `needs_parameters` and `schema_failed` both stop before the reviewer is
    /// called. A reviewer failure keeps the schema-valid pre-review intent.
    pub async fn fill(&self, request: FillRequest) -> IntentResult<FillOutcome> {
        let profile = self.registry.require_slug(&request.profile_slug)?;
        let template = if request.use_template {
            profile.load_template()?
        } else {
            json!({})
        };
        let schema = profile.load_schema()?;

        let mut suggestions = Suggestions::default();
        let mut intent = match request.client_intent {
            Some(client_intent) => merge_with_template(&template, &Value::Object(client_intent)),
            None => {
                let Collection {
                    intent,
                    missing,
                    default_intent,
                    defaults_overview,
                    summary_hint,
                } = self
                    .collect(profile, &template, &request.user_request, request.model.as_deref())
                    .await?;
                suggestions = Suggestions {
                    default_intent,
                    defaults_overview,
                };

                if !missing.is_empty() {
                    info!(profile = %profile.slug, missing = missing.len(), "waiting for parameters");
                    let review = ReviewPayload {
                        stage: Some("collecting".to_string()),
                        summary: Some(summary_hint.clone()),
                        missing: Some(missing.clone()),
                        defaults_overview: suggestions.defaults_overview.clone(),
                        ..ReviewPayload::default()
                    };
                    return Ok(outcome(
                        profile,
                        intent,
                        build_collection_summary(&missing, &summary_hint),
                        review,
                        PipelineStatus::NeedsParameters,
                        missing,
                        suggestions,
                    ));
                }
                intent
            }
        };
        force_profile(&mut intent, &profile.profile_identifier);

        let schema_initial = validate(&intent, &schema);
        let mut review = ReviewPayload {
            schema_initial: Some(schema_initial.clone()),
            ..ReviewPayload::default()
        };

        if !schema_initial.valid {
            let status = PipelineStatus::SchemaFailed;
            let summary = build_multilayer_summary(&schema_initial, None, &review, &intent, status, None);
            return Ok(outcome(profile, intent, summary, review, status, Vec::new(), suggestions));
        }

        let (status, schema_final) = match self.review(&intent, &schema).await {
            Err(err) => {
                warn!(profile = %profile.slug, error = %err, "reviewer failed, keeping pre-review intent");
                review.reasoner_error = Some(err.to_string());
                (PipelineStatus::ReasonerFailed, None)
            }
            Ok(reviewed) => {
                if let Some(updated) = reviewed.updated_intent {
                    intent = updated;
                }
                force_profile(&mut intent, &profile.profile_identifier);

                let schema_final = validate(&intent, &schema);
                review.schema_final = Some(schema_final.clone());
                review.physics = reviewed.physics;
                review.expert = reviewed.expert;
                review.auto_corrections = reviewed.auto_corrections;

                let status = if schema_final.valid {
                    PipelineStatus::Ok
                } else {
                    PipelineStatus::SchemaRegression
                };
                (status, Some(schema_final))
            }
        };

        info!(profile = %profile.slug, status = %status, "fill pipeline finished");
        let summary = build_multilayer_summary(
            &schema_initial,
            schema_final.as_ref(),
            &review,
            &intent,
            status,
            None,
        );
        Ok(outcome(profile, intent, summary, review, status, Vec::new(), suggestions))
    }
}

fn outcome(
    profile: &Profile,
    intent: Value,
    human_summary: String,
    review: ReviewPayload,
    pipeline_status: PipelineStatus,
    missing_parameters: Vec<MissingParameter>,
    suggestions: Suggestions,
) -> FillOutcome {
    FillOutcome {
        profile_slug: profile.slug.clone(),
        family: profile.family.clone(),
        intent,
        human_summary,
        review,
        pipeline_status,
        missing_parameters,
        default_intent: suggestions.default_intent,
        defaults_overview: suggestions.defaults_overview,
    }
}
