//! Route handlers for the REST API.

pub mod catalog;
pub mod drafts;
pub mod health;
pub mod market;
pub mod posts;

use crate::draft::PostType;
use crate::rest::error::ApiError;

/// Post type from a path segment; unknown types are 404s
pub(crate) fn parse_post_type(raw: &str) -> Result<PostType, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown post type '{}'", raw)))
}
