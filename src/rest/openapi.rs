//! OpenAPI specification builder using utoipa.

use utoipa::OpenApi;

use crate::catalog::CatalogOption;
use crate::rest::dto::{
    DraftResponse, HealthResponse, LatestPostResponse, ListingSummary, ListingsResponse,
    PlanResponse, ReceiptResponse, SpecificationResponse, StepValidationResponse,
};
use crate::rest::error::ErrorResponse;
use crate::schema::FieldError;
use crate::submission::SuccessRedirect;
use crate::wizard::{DraftEvent, Progress, Step};

/// OpenAPI documentation for the swapboard REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "swapboard API",
        description = "Local REST API for composing, validating and submitting marketplace posts."
    ),
    paths(
        crate::rest::routes::health::health,
        // Draft endpoints
        crate::rest::routes::drafts::get_one,
        crate::rest::routes::drafts::save,
        crate::rest::routes::drafts::clear,
        crate::rest::routes::drafts::apply_event,
        crate::rest::routes::drafts::validate_step,
        crate::rest::routes::drafts::submit,
        crate::rest::routes::posts::latest,
        // Catalog endpoints
        crate::rest::routes::catalog::categories,
        crate::rest::routes::catalog::subcategories,
        crate::rest::routes::catalog::specifications,
        crate::rest::routes::catalog::options,
        // Marketplace endpoints
        crate::rest::routes::market::listings,
        crate::rest::routes::market::plans,
        crate::rest::routes::market::receipt,
    ),
    components(
        schemas(
            // Response types
            HealthResponse,
            DraftResponse,
            StepValidationResponse,
            LatestPostResponse,
            SpecificationResponse,
            ListingSummary,
            ListingsResponse,
            PlanResponse,
            ReceiptResponse,
            SuccessRedirect,
            CatalogOption,
            FieldError,
            Progress,
            Step,
            ErrorResponse,
            // Request types
            DraftEvent,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Drafts", description = "Draft editing, step validation and submission"),
        (name = "Posts", description = "Published post previews"),
        (name = "Catalog", description = "Categories and specification options"),
        (name = "Marketplace", description = "Listings and plans from the marketplace backend"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::json().expect("Failed to generate OpenAPI spec");
        assert!(spec.contains("swapboard API"));
        assert!(spec.contains("/api/v1/health"));
        assert!(spec.contains("/api/v1/drafts/{post_type}/submit"));
        assert!(spec.contains("/api/v1/catalog/specifications/{category}/{subcategory}"));
    }

    #[test]
    fn test_openapi_has_all_tags() {
        let spec = ApiDoc::json().expect("Failed to generate OpenAPI spec");
        for tag in ["Health", "Drafts", "Posts", "Catalog", "Marketplace"] {
            assert!(spec.contains(&format!("\"{}\"", tag)), "missing tag {tag}");
        }
    }
}
