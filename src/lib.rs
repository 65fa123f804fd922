//! CFD Intent Library
//!
//! Turns free-form cooling-plate CFD requests into schema-conformant intent
//! documents: template merge, LLM-backed parameter collection, schema
//! validation, an independent physics/expert review and persistence.

pub mod cli;
pub mod config;
pub mod error;
pub mod intent;
pub mod jobs;
pub mod llm;
pub mod pipeline;
pub mod profile;
pub mod schema;
pub mod server;
pub mod storage;
pub mod summary;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use error::{IntentError, IntentResult, JobError, LlmError};
pub use jobs::{JobRecord, JobRegistry, JobState};
pub use llm::{ChatClient, ChatRequest, HttpChatClient};
pub use pipeline::{IntentPipeline, PipelineStatus, ReviewPayload};
pub use profile::{Profile, ProfileRegistry, DEFAULT_PROFILE_SLUG};
pub use schema::{SchemaIssue, SchemaReport};
pub use storage::{IntentStore, StorageRecord};
