//! Latest published post preview.

use axum::{extract::State, Json};

use crate::rest::dto::LatestPostResponse;
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// Most recent post published from this workspace, while still fresh
#[utoipa::path(
    get,
    path = "/api/v1/posts/latest",
    tag = "Posts",
    responses(
        (status = 200, description = "Latest post preview", body = LatestPostResponse),
        (status = 404, description = "No recent post", body = ErrorResponse)
    )
)]
pub async fn latest(State(state): State<ApiState>) -> Result<Json<LatestPostResponse>, ApiError> {
    state
        .store
        .latest_post()
        .map(|p| Json(LatestPostResponse::from(p)))
        .ok_or_else(|| ApiError::NotFound("No recently published post".to_string()))
}
