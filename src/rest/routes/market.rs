//! Read-through views of the marketplace backend.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{fetch_listings, plans_or_default};
use crate::rest::dto::{ListingsResponse, PlanResponse, ReceiptResponse};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;

/// Published items and services, fetched together
#[utoipa::path(
    get,
    path = "/api/v1/listings",
    tag = "Marketplace",
    responses(
        (status = 200, description = "Items and services", body = ListingsResponse),
        (status = 502, description = "Either list could not be fetched", body = ErrorResponse)
    )
)]
pub async fn listings(State(state): State<ApiState>) -> Result<Json<ListingsResponse>, ApiError> {
    let listings = fetch_listings(state.api.as_ref()).await?;
    Ok(Json(ListingsResponse::from(listings)))
}

/// Subscription plans, falling back to the built-in set
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    tag = "Marketplace",
    responses(
        (status = 200, description = "Available plans", body = Vec<PlanResponse>)
    )
)]
pub async fn plans(State(state): State<ApiState>) -> Json<Vec<PlanResponse>> {
    let plans = plans_or_default(state.api.as_ref()).await;
    Json(plans.into_iter().map(PlanResponse::from).collect())
}

/// Receipt of a completed payment
#[utoipa::path(
    get,
    path = "/api/v1/payments/{tx_ref}/receipt",
    tag = "Marketplace",
    params(("tx_ref" = String, Path, description = "Transaction reference")),
    responses(
        (status = 200, description = "Payment receipt", body = ReceiptResponse),
        (status = 404, description = "No receipt for this reference", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    )
)]
pub async fn receipt(
    State(state): State<ApiState>,
    Path(tx_ref): Path<String>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let receipt = state.api.receipt(&tx_ref).await?;
    Ok(Json(ReceiptResponse::from(receipt)))
}
