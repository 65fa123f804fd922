//! Schema loading and validation

pub mod loader;
pub mod validator;

pub use loader::load_json;
pub use validator::{validate, SchemaIssue, SchemaReport};
