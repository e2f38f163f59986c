//! Draft editing, step validation and submission endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::parse_post_type;
use crate::draft::DraftPatch;
use crate::rest::dto::{DraftResponse, StepValidationResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::submission::SuccessRedirect;
use crate::wizard::{DraftEvent, Progress, Step, WizardSession};

/// Get the stored draft
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{post_type}",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    responses(
        (status = 200, description = "Stored draft, null when absent", body = DraftResponse),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(post_type): Path<String>,
) -> Result<Json<DraftResponse>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    Ok(Json(DraftResponse::new(
        post_type,
        state.store.get_draft(post_type),
    )))
}

/// Merge fields into the stored draft. `null` clears a field.
#[utoipa::path(
    patch,
    path = "/api/v1/drafts/{post_type}",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    request_body(content = Object, description = "Partial draft in camelCase"),
    responses(
        (status = 200, description = "Draft after the merge", body = DraftResponse),
        (status = 400, description = "Invalid field value", body = ErrorResponse),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn save(
    State(state): State<ApiState>,
    Path(post_type): Path<String>,
    Json(patch): Json<DraftPatch>,
) -> Result<Json<DraftResponse>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    let mut session = WizardSession::open(state.store.clone(), post_type, state.limits());
    session.edit(&patch)?;

    // Persistence is best effort; the merged draft is returned either way
    let draft = session
        .save_draft()
        .unwrap_or_else(|| session.draft().clone());
    Ok(Json(DraftResponse::new(post_type, Some(draft))))
}

/// Discard the stored draft
#[utoipa::path(
    delete,
    path = "/api/v1/drafts/{post_type}",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    responses(
        (status = 204, description = "Draft cleared"),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn clear(
    State(state): State<ApiState>,
    Path(post_type): Path<String>,
) -> Result<StatusCode, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    state.store.clear_draft(post_type);
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a form interaction (category pick, image add, ...) and save
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{post_type}/events",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    request_body = DraftEvent,
    responses(
        (status = 200, description = "Draft after the event", body = DraftResponse),
        (status = 400, description = "Event rejected", body = ErrorResponse),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn apply_event(
    State(state): State<ApiState>,
    Path(post_type): Path<String>,
    Json(event): Json<DraftEvent>,
) -> Result<Json<DraftResponse>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    let mut session = WizardSession::open(state.store.clone(), post_type, state.limits());
    session.apply(&event)?;

    let draft = session
        .save_draft()
        .unwrap_or_else(|| session.draft().clone());
    Ok(Json(DraftResponse::new(post_type, Some(draft))))
}

/// Validate the stored draft against one step
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{post_type}/steps/{step}/validate",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service"),
        ("step" = String, Path, description = "Step slug, e.g. basic-info")
    ),
    responses(
        (status = 200, description = "Validation result", body = StepValidationResponse),
        (status = 404, description = "Unknown post type or step", body = ErrorResponse)
    )
)]
pub async fn validate_step(
    State(state): State<ApiState>,
    Path((post_type, step)): Path<(String, String)>,
) -> Result<Json<StepValidationResponse>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    let step: Step = step.parse().map_err(ApiError::NotFound)?;

    let session = WizardSession::open_at(state.store.clone(), post_type, state.limits(), step);
    let step = session.step();
    let errors = match session.validate() {
        Ok(()) => Vec::new(),
        Err(e) => e.errors,
    };
    let valid = errors.is_empty();

    Ok(Json(StepValidationResponse {
        step,
        valid,
        errors,
        progress: Progress::of(post_type, step),
        next_step: step.next_in(post_type).filter(|_| valid),
    }))
}

/// Submit the stored draft to the marketplace
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{post_type}/submit",
    tag = "Drafts",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    responses(
        (status = 200, description = "Post published", body = SuccessRedirect),
        (status = 400, description = "Draft incomplete", body = ErrorResponse),
        (status = 409, description = "Submission already in progress", body = ErrorResponse),
        (status = 502, description = "Marketplace rejected the post", body = ErrorResponse)
    )
)]
pub async fn submit(
    State(state): State<ApiState>,
    Path(post_type): Path<String>,
) -> Result<Json<SuccessRedirect>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    let redirect = state.pipeline(post_type).submit().await?;
    Ok(Json(redirect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketplaceApi;
    use crate::config::Config;
    use crate::draft::{DraftStore, PostType};
    use serde_json::json;
    use std::sync::Arc;

    fn test_state() -> ApiState {
        let (store, _) = DraftStore::in_memory();
        ApiState::new(Config::default(), store, Arc::new(MockMarketplaceApi::new()))
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let state = test_state();
        let patch = DraftPatch::new().set("title", "Lamp");
        save(State(state.clone()), Path("item".to_string()), Json(patch))
            .await
            .unwrap();

        let Json(resp) = get_one(State(state), Path("items".to_string()))
            .await
            .unwrap();
        assert_eq!(resp.post_type, "item");
        assert_eq!(resp.draft.unwrap().title.as_deref(), Some("Lamp"));
    }

    #[tokio::test]
    async fn test_unknown_post_type() {
        let err = get_one(State(test_state()), Path("vehicle".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_event_rejected() {
        let event: DraftEvent = serde_json::from_value(json!({"type": "removeImage", "index": 3})).unwrap();
        let err = apply_event(State(test_state()), Path("item".to_string()), Json(event))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_validate_step_reports_errors() {
        let state = test_state();
        let Json(resp) = validate_step(
            State(state.clone()),
            Path(("item".to_string(), "basic-info".to_string())),
        )
        .await
        .unwrap();
        assert!(!resp.valid);
        assert!(resp.errors.iter().any(|e| e.field == "title"));
        assert!(resp.next_step.is_none());

        state.store.save_draft(
            PostType::Item,
            &DraftPatch::new()
                .set("title", "Lamp")
                .set("category", "home")
                .set("subcategory", "lighting")
                .set("images", json!(["a.png"])),
        );
        let Json(resp) = validate_step(
            State(state),
            Path(("item".to_string(), "basic-info".to_string())),
        )
        .await
        .unwrap();
        assert!(resp.valid);
        assert_eq!(resp.next_step, Some(Step::Specifications));
    }

    #[tokio::test]
    async fn test_submit_incomplete_is_validation_error() {
        let err = submit(State(test_state()), Path("service".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }
}
