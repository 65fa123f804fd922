use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use serde_json::json;

use crate::error::{IntentError, JobError};
use crate::schema::SchemaReport;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<IntentError> for ApiError {
    fn from(err: IntentError) -> Self {
        let status = match &err {
            IntentError::UnknownProfile(_)
            | IntentError::MissingProfile
            | IntentError::NotAnObject
            | IntentError::InvalidJobId(_) => StatusCode::BAD_REQUEST,
            IntentError::Collector(_) | IntentError::FastFill(_) => StatusCode::BAD_GATEWAY,
            IntentError::SchemaNotFound { .. }
            | IntentError::Decode { .. }
            | IntentError::Storage { .. }
            | IntentError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let status = match &err {
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::InvalidTransition { .. } => StatusCode::CONFLICT,
            JobError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// 400 with `{valid: false, issues}` for documents that failed validation.
pub fn invalid_document(report: SchemaReport) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"valid": false, "issues": report.issues})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn collector_failures_map_to_bad_gateway() {
        let err = IntentError::Collector(LlmError::Configuration {
            missing: "api_key".into(),
        });
        assert_eq!(ApiError::from(err).status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_schema_maps_to_server_error() {
        let err = IntentError::SchemaNotFound {
            path: "/schemas/x.schema.json".into(),
        };
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.message.starts_with("Schema/Template not found"));
    }

    #[test]
    fn job_errors_map_to_http_statuses() {
        assert_eq!(
            ApiError::from(JobError::NotFound("a".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(JobError::InvalidTransition {
                job_id: "a".into(),
                from: "finished".into(),
                to: "running".into()
            })
            .status,
            StatusCode::CONFLICT
        );
    }
}
