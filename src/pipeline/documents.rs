use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::IntentPipeline;
use crate::error::{IntentError, IntentResult};
use crate::intent::{force_profile, merge_job_meta};
use crate::schema::{validate, SchemaReport};
use crate::summary::summarize_intent;

pub const SCHEMA_BUNDLE_VERSION: &str = "v1.0";

/// Either the operation's result or the schema report that blocked it.
#[derive(Debug, Clone, PartialEq)]
pub enum Checked<T> {
    Valid(T),
    Invalid(SchemaReport),
}

/// Schema and template of one profile, served to the editor.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDocuments {
    pub version: &'static str,
    pub profile: String,
    pub schema: Value,
    pub template: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    #[serde(flatten)]
    pub report: SchemaReport,
    pub profile_slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedIntent {
    pub ok: bool,
    pub job_id: String,
    pub relative_path: String,
    pub storage_path: String,
    pub intent: Value,
    pub profile_slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedIntent {
    pub ok: bool,
    pub filename: String,
    pub profile_slug: String,
    pub path: PathBuf,
}

fn require_object(intent: &Value) -> IntentResult<()> {
    if intent.is_object() {
        Ok(())
    } else {
        Err(IntentError::NotAnObject)
    }
}

impl IntentPipeline {
    pub fn profile_documents(&self, slug: &str) -> IntentResult<ProfileDocuments> {
        let profile = self.registry.require_slug(slug)?;
        Ok(ProfileDocuments {
            version: SCHEMA_BUNDLE_VERSION,
            profile: profile.profile_identifier.clone(),
            schema: profile.load_schema()?,
            template: profile.load_template()?,
        })
    }

    /// Validate an arbitrary intent; the profile comes from `profile_slug`
    /// when it names a known profile, otherwise from `intent.profile`.
    pub fn validate_intent(
        &self,
        intent: &Value,
        profile_slug: Option<&str>,
    ) -> IntentResult<ValidationOutcome> {
        require_object(intent)?;
        let profile = self.registry.resolve_for_intent(profile_slug, intent)?;
        let schema = profile.load_schema()?;
        Ok(ValidationOutcome {
            report: validate(intent, &schema),
            profile_slug: profile.slug.clone(),
        })
    }

    /// Validate against the schema named by `intent.profile`, then render it.
    pub fn summarize(&self, intent: &Value) -> IntentResult<Checked<String>> {
        require_object(intent)?;
        let profile = self.registry.resolve_for_intent(None, intent)?;
        let report = validate(intent, &profile.load_schema()?);
        if !report.valid {
            return Ok(Checked::Invalid(report));
        }
        Ok(Checked::Valid(summarize_intent(intent)))
    }

    /// Force the profile, merge `job_meta`, validate and persist.
    pub fn save(
        &self,
        intent: &Value,
        profile_slug: Option<&str>,
        job_meta: Option<&Map<String, Value>>,
    ) -> IntentResult<Checked<SavedIntent>> {
        require_object(intent)?;
        let profile = self.registry.resolve_for_intent(profile_slug, intent)?;
        let schema = profile.load_schema()?;

        let mut document = intent.clone();
        force_profile(&mut document, &profile.profile_identifier);
        if let Some(job_meta) = job_meta {
            merge_job_meta(&mut document, job_meta);
        }

        let report = validate(&document, &schema);
        if !report.valid {
            return Ok(Checked::Invalid(report));
        }

        let (saved, record) = self.store.save(&document)?;
        Ok(Checked::Valid(SavedIntent {
            ok: true,
            job_id: record.job_id,
            relative_path: record.relative_path,
            storage_path: record.storage_path,
            intent: saved,
            profile_slug: profile.slug.clone(),
        }))
    }

    /// Validate against `intent.profile` and write a flat archive copy.
    pub fn apply(&self, intent: &Value) -> IntentResult<Checked<ArchivedIntent>> {
        require_object(intent)?;
        let profile = self.registry.resolve_for_intent(None, intent)?;
        let report = validate(intent, &profile.load_schema()?);
        if !report.valid {
            return Ok(Checked::Invalid(report));
        }

        let record = self.store.archive(intent, &profile.slug)?;
        Ok(Checked::Valid(ArchivedIntent {
            ok: true,
            filename: record.filename,
            profile_slug: profile.slug.clone(),
            path: record.path,
        }))
    }
}
