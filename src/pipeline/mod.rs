//! Intent pipeline
//!
//! `IntentPipeline` ties the profile registry, the generation endpoints and
//! the intent store together and exposes one method per logical endpoint:
//!
//! - `fill`: collect -> initial validation -> review -> final validation
//! - `fill_fast`: single generation call over a dimension-prepared template
//! - `validate_intent`, `summarize`, `save`, `apply`: document operations
//!
//! Every request works on its own copies of the template and intent; the
//! only shared state is read-only configuration.

mod collector;
mod documents;
mod fast_fill;
mod fill;
mod review;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;

use crate::config::Settings;
use crate::error::LlmError;
use crate::llm::{
    AutoCorrections, ChatClient, ChatRequest, ExpertReview, HttpChatClient, MissingParameter,
    ModelPresets, PhysicsCheck,
};
use crate::profile::ProfileRegistry;
use crate::schema::SchemaReport;
use crate::storage::IntentStore;

pub use documents::{ArchivedIntent, Checked, ProfileDocuments, SavedIntent, ValidationOutcome};
pub use fast_fill::{FastFillOutcome, FastFillRequest};
pub use fill::{FillOutcome, FillRequest};

/// Terminal state of one full-fill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    NeedsParameters,
    SchemaFailed,
    SchemaRegression,
    ReasonerFailed,
}

impl PipelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Ok => "ok",
            PipelineStatus::NeedsParameters => "needs_parameters",
            PipelineStatus::SchemaFailed => "schema_failed",
            PipelineStatus::SchemaRegression => "schema_regression",
            PipelineStatus::ReasonerFailed => "reasoner_failed",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-by-stage record returned as `review` by the full fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_initial: Option<SchemaReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_final: Option<SchemaReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert: Option<ExpertReview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_corrections: Option<AutoCorrections>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoner_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<MissingParameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults_overview: Option<Value>,
}

pub struct IntentPipeline {
    registry: ProfileRegistry,
    store: IntentStore,
    presets: ModelPresets,
    client: Arc<dyn ChatClient>,
}

impl IntentPipeline {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(settings, Arc::new(HttpChatClient::new()))
    }

    /// Construct with a custom generation client (used for testing/mocking).
    pub fn with_client(settings: &Settings, client: Arc<dyn ChatClient>) -> Self {
        Self {
            registry: ProfileRegistry::new(&settings.cfd_schema_dir),
            store: IntentStore::new(&settings.cfd_storage_dir),
            presets: ModelPresets::from_settings(settings),
            client,
        }
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn store(&self) -> &IntentStore {
        &self.store
    }

    /// One generation call bounded by the endpoint's timeout.
    async fn call(&self, request: ChatRequest) -> Result<Value, LlmError> {
        let limit = request.endpoint.timeout;
        let url = request.endpoint.url();
        timeout(limit, self.client.complete_json(request))
            .await
            .map_err(|_| LlmError::Timeout {
                url,
                timeout_secs: limit.as_secs(),
            })?
    }
}
