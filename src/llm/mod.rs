//! Generation-service access
//!
//! - `client`: the [`ChatClient`] seam and its reqwest implementation
//! - `presets`: model-alias endpoint resolution
//! - `response`: typed response shapes per pipeline stage
//! - `prompts`: system/user instruction builders

pub mod client;
pub mod presets;
pub mod prompts;
pub mod response;

pub use client::{ChatClient, ChatMessage, ChatRequest, HttpChatClient, Stage};
pub use presets::{EndpointConfig, ModelPresets};
pub use response::{
    AutoCorrections, CollectorResponse, ExpertReview, FastFillResponse, MissingParameter,
    PhysicsCheck, ReviewerResponse, Suggestion,
};
