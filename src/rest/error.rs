//! API error types and responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::ApiError as RemoteError;
use crate::schema::{FieldError, ValidationErrors};
use crate::submission::SubmissionError;
use crate::wizard::{ReduceError, WizardError};

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found
    NotFound(String),
    /// Field-level validation failure
    ValidationError(ValidationErrors),
    /// Bad request
    BadRequest(String),
    /// Operation already in progress
    Conflict(String),
    /// Marketplace backend failed; message is safe to show users
    BadGateway(String),
}

/// Error response body
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Per-field problems for validation errors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, errors) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, Vec::new()),
            ApiError::ValidationError(errs) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                errs.to_string(),
                errs.errors,
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, Vec::new()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, Vec::new()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "remote_error", msg, Vec::new()),
        };

        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
                errors,
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::ValidationError(err)
    }
}

impl From<ReduceError> for ApiError {
    fn from(err: ReduceError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Validation(errors) => ApiError::ValidationError(errors),
            WizardError::Reduce(e) => e.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<RemoteError> for ApiError {
    fn from(err: RemoteError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.user_message().to_string())
        } else {
            ApiError::BadGateway(err.user_message().to_string())
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(errors) => ApiError::ValidationError(errors),
            SubmissionError::AlreadySubmitting => ApiError::Conflict(err.user_message()),
            SubmissionError::Remote(_) => ApiError::BadGateway(err.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> ErrorResponse {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = ApiError::NotFound("No recent post".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await.error, "not_found");
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let errors = ValidationErrors {
            errors: vec![FieldError {
                field: "title".to_string(),
                message: "This field is required".to_string(),
            }],
        };
        let response = ApiError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].field, "title");
    }

    #[tokio::test]
    async fn test_remote_failure_hides_details() {
        let err = SubmissionError::Remote(RemoteError::http("/api/items", 500, "stack trace"));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = body_of(response).await;
        assert!(!body.message.contains("stack trace"));
        assert!(body.message.contains("problem submitting your post"));
    }

    #[tokio::test]
    async fn test_already_submitting_is_conflict() {
        let response = ApiError::from(SubmissionError::AlreadySubmitting).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
