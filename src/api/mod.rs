//! Marketplace backend access
//!
//! `MarketplaceApi` is the seam between the submission pipeline and the
//! network. `RemoteClient` talks HTTP; `MockMarketplaceApi` records calls
//! for tests and offline runs.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use tracing::{info, warn};

pub use client::RemoteClient;
pub use error::ApiError;
pub use mock::MockMarketplaceApi;
pub use types::{
    CreatePostPayload, CreatePostResponse, Listing, Listings, Notification, NotificationAction,
    PaymentInitRequest, PaymentInitResponse, PaymentVerification, Plan, PostsStatus, Receipt,
    SwapRequest,
};

use crate::draft::PostType;

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn create_item(&self, payload: &CreatePostPayload)
        -> Result<CreatePostResponse, ApiError>;

    async fn create_service(
        &self,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError>;

    async fn list_items(&self) -> Result<Vec<Listing>, ApiError>;

    async fn list_services(&self) -> Result<Vec<Listing>, ApiError>;

    async fn plans(&self) -> Result<Vec<Plan>, ApiError>;

    async fn posts_status(&self, email: &str) -> Result<PostsStatus, ApiError>;

    async fn initialize_payment(
        &self,
        request: &PaymentInitRequest,
    ) -> Result<PaymentInitResponse, ApiError>;

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification, ApiError>;

    async fn receipt(&self, tx_ref: &str) -> Result<Receipt, ApiError>;

    async fn notifications(&self, email: &str) -> Result<Vec<Notification>, ApiError>;

    async fn respond_to_notification(
        &self,
        id: &str,
        action: NotificationAction,
    ) -> Result<(), ApiError>;

    async fn send_swap_request(&self, request: &SwapRequest) -> Result<(), ApiError>;

    /// Create a post on the endpoint matching its type
    async fn create_post(
        &self,
        post_type: PostType,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError> {
        match post_type {
            PostType::Item => self.create_item(payload).await,
            PostType::Service => self.create_service(payload).await,
        }
    }
}

/// Fetch items and services concurrently. Either failure fails the whole call.
pub async fn fetch_listings(api: &dyn MarketplaceApi) -> Result<Listings, ApiError> {
    let (items, services) = tokio::try_join!(api.list_items(), api.list_services())?;
    info!(
        items = items.len(),
        services = services.len(),
        "Fetched listings"
    );
    Ok(Listings { items, services })
}

/// Remote plans, or the built-in set when the backend is unreachable
pub async fn plans_or_default(api: &dyn MarketplaceApi) -> Vec<Plan> {
    match api.plans().await {
        Ok(plans) if !plans.is_empty() => plans,
        Ok(_) => Plan::defaults(),
        Err(e) => {
            warn!(error = %e, "Falling back to built-in plans");
            Plan::defaults()
        }
    }
}
