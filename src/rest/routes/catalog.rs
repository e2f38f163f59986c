//! Category and specification lookups.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    Json,
};

use super::parse_post_type;
use crate::catalog::{Catalog, CatalogOption};
use crate::rest::dto::SpecificationResponse;
use crate::rest::error::{ApiError, ErrorResponse};

/// Categories offered for a post type
#[utoipa::path(
    get,
    path = "/api/v1/catalog/{post_type}/categories",
    tag = "Catalog",
    params(
        ("post_type" = String, Path, description = "item or service")
    ),
    responses(
        (status = 200, description = "Categories in display order", body = Vec<CatalogOption>),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn categories(Path(post_type): Path<String>) -> Result<Json<Vec<CatalogOption>>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    Ok(Json(Catalog::builtin().categories(post_type)))
}

/// Subcategories of a category; unknown categories give an empty list
#[utoipa::path(
    get,
    path = "/api/v1/catalog/{post_type}/categories/{category}/subcategories",
    tag = "Catalog",
    params(
        ("post_type" = String, Path, description = "item or service"),
        ("category" = String, Path, description = "Category value")
    ),
    responses(
        (status = 200, description = "Subcategories", body = Vec<CatalogOption>),
        (status = 404, description = "Unknown post type", body = ErrorResponse)
    )
)]
pub async fn subcategories(
    Path((post_type, category)): Path<(String, String)>,
) -> Result<Json<Vec<CatalogOption>>, ApiError> {
    let post_type = parse_post_type(&post_type)?;
    Ok(Json(
        Catalog::builtin().get_subcategories(&category, post_type),
    ))
}

/// Specification fields of a subcategory
#[utoipa::path(
    get,
    path = "/api/v1/catalog/specifications/{category}/{subcategory}",
    tag = "Catalog",
    params(
        ("category" = String, Path, description = "Category value"),
        ("subcategory" = String, Path, description = "Subcategory value")
    ),
    responses(
        (status = 200, description = "Specification fields", body = Vec<SpecificationResponse>)
    )
)]
pub async fn specifications(
    Path((category, subcategory)): Path<(String, String)>,
) -> Json<Vec<SpecificationResponse>> {
    let fields = Catalog::builtin()
        .specification_fields(&category, &subcategory)
        .iter()
        .map(|f| SpecificationResponse {
            name: f.name.clone(),
            options: f.options.clone(),
            depends_on: f.depends_on.clone(),
        })
        .collect();
    Json(fields)
}

/// Options of one field. Dependent fields read the parent's value from the
/// query string, e.g. `?Brand=Apple`.
#[utoipa::path(
    get,
    path = "/api/v1/catalog/specifications/{category}/{subcategory}/{field}/options",
    tag = "Catalog",
    params(
        ("category" = String, Path, description = "Category value"),
        ("subcategory" = String, Path, description = "Subcategory value"),
        ("field" = String, Path, description = "Specification field name")
    ),
    responses(
        (status = 200, description = "Allowed values, empty when the parent is unset", body = Vec<String>)
    )
)]
pub async fn options(
    Path((category, subcategory, field)): Path<(String, String, String)>,
    Query(selected): Query<HashMap<String, String>>,
) -> Json<Vec<String>> {
    Json(Catalog::builtin().get_specification_options(
        &category,
        &subcategory,
        &field,
        &selected,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_service_categories() {
        let Json(cats) = categories(Path("service".to_string())).await.unwrap();
        assert!(cats.iter().any(|c| c.value == "home-services"));
        assert!(!cats.iter().any(|c| c.value == "fashion"));
    }

    #[tokio::test]
    async fn test_unknown_category_subcategories_empty() {
        let Json(subs) = subcategories(Path(("item".to_string(), "nope".to_string())))
            .await
            .unwrap();
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_model_depends_on_brand() {
        let Json(fields) =
            specifications(Path(("electronics".to_string(), "laptops".to_string()))).await;
        let model = fields.iter().find(|f| f.name == "Model").unwrap();
        assert_eq!(model.depends_on.as_deref(), Some("Brand"));

        let mut selected = HashMap::new();
        selected.insert("Brand".to_string(), "Apple".to_string());
        let Json(opts) = options(
            Path((
                "electronics".to_string(),
                "laptops".to_string(),
                "Model".to_string(),
            )),
            Query(selected),
        )
        .await;
        assert_eq!(opts, vec!["MacBook Air", "MacBook Pro"]);
    }
}
