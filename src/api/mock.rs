//! In-memory marketplace backend for tests and offline runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::{
    ITEMS_PATH, NOTIFICATIONS_PATH, PAYMENT_INIT_PATH, PAYMENT_VERIFY_PATH, PLANS_PATH,
    POSTS_STATUS_PATH, RECEIPTS_PATH, SERVICES_PATH, SWAP_REQUESTS_PATH,
};
use super::error::ApiError;
use super::types::{
    CreatePostPayload, CreatePostResponse, Listing, Notification, NotificationAction,
    PaymentInitRequest, PaymentInitResponse, PaymentVerification, Plan, PostsStatus, Receipt,
    SwapRequest,
};
use super::MarketplaceApi;

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    payloads: Vec<CreatePostPayload>,
    failures: HashMap<String, ApiError>,
    post_id: Option<String>,
    items: Vec<Listing>,
    services: Vec<Listing>,
    plans: Vec<Plan>,
    receipts: HashMap<String, Receipt>,
    notifications: Vec<Notification>,
}

/// Records every call; failures are configured per endpoint path
#[derive(Clone, Default)]
pub struct MockMarketplaceApi {
    state: Arc<Mutex<MockState>>,
    create_delay: Option<Duration>,
}

impl MockMarketplaceApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id returned by create calls; `None` means the backend omits it
    pub fn with_post_id(self, id: Option<&str>) -> Self {
        self.lock().post_id = id.map(str::to_string);
        self
    }

    /// Fail every call to `endpoint` with `error`
    pub fn with_failure(self, endpoint: &str, error: ApiError) -> Self {
        self.lock().failures.insert(endpoint.to_string(), error);
        self
    }

    /// Hold create calls open for `delay` before answering
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn with_items(self, items: Vec<Listing>) -> Self {
        self.lock().items = items;
        self
    }

    pub fn with_services(self, services: Vec<Listing>) -> Self {
        self.lock().services = services;
        self
    }

    pub fn with_plans(self, plans: Vec<Plan>) -> Self {
        self.lock().plans = plans;
        self
    }

    pub fn with_receipt(self, receipt: Receipt) -> Self {
        self.lock()
            .receipts
            .insert(receipt.tx_ref.clone(), receipt);
        self
    }

    pub fn with_notifications(self, notifications: Vec<Notification>) -> Self {
        self.lock().notifications = notifications;
        self
    }

    /// Calls made so far, as "METHOD path"
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Payloads received by the create endpoints
    pub fn payloads(&self) -> Vec<CreatePostPayload> {
        self.lock().payloads.clone()
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded calls
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call and return the configured failure for `endpoint`, if any
    fn record(&self, method: &str, path: &str, endpoint: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("{} {}", method, path));
        match state.failures.get(endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn create(
        &self,
        path: &str,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("POST", path, path)?;
        let mut state = self.lock();
        state.payloads.push(payload.clone());
        Ok(CreatePostResponse {
            success: true,
            message: None,
            id: state.post_id.clone(),
            data: None,
        })
    }
}

#[async_trait]
impl MarketplaceApi for MockMarketplaceApi {
    async fn create_item(
        &self,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError> {
        self.create(ITEMS_PATH, payload).await
    }

    async fn create_service(
        &self,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError> {
        self.create(SERVICES_PATH, payload).await
    }

    async fn list_items(&self) -> Result<Vec<Listing>, ApiError> {
        self.record("GET", ITEMS_PATH, ITEMS_PATH)?;
        Ok(self.lock().items.clone())
    }

    async fn list_services(&self) -> Result<Vec<Listing>, ApiError> {
        self.record("GET", SERVICES_PATH, SERVICES_PATH)?;
        Ok(self.lock().services.clone())
    }

    async fn plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.record("GET", PLANS_PATH, PLANS_PATH)?;
        Ok(self.lock().plans.clone())
    }

    async fn posts_status(&self, email: &str) -> Result<PostsStatus, ApiError> {
        self.record("GET", &format!("{}?email={}", POSTS_STATUS_PATH, email), POSTS_STATUS_PATH)?;
        let total = self.lock().payloads.len() as u32;
        Ok(PostsStatus {
            total_posts: total,
            ..Default::default()
        })
    }

    async fn initialize_payment(
        &self,
        request: &PaymentInitRequest,
    ) -> Result<PaymentInitResponse, ApiError> {
        self.record("POST", PAYMENT_INIT_PATH, PAYMENT_INIT_PATH)?;
        Ok(PaymentInitResponse {
            checkout_url: Some(format!("https://checkout.test/{}", request.tx_ref)),
            tx_ref: request.tx_ref.clone(),
        })
    }

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification, ApiError> {
        let path = format!("{}/{}", PAYMENT_VERIFY_PATH, tx_ref);
        self.record("GET", &path, PAYMENT_VERIFY_PATH)?;
        let paid = self.lock().receipts.contains_key(tx_ref);
        Ok(PaymentVerification {
            tx_ref: tx_ref.to_string(),
            status: if paid { "success" } else { "pending" }.to_string(),
            amount: None,
        })
    }

    async fn receipt(&self, tx_ref: &str) -> Result<Receipt, ApiError> {
        let path = format!("{}/{}", RECEIPTS_PATH, tx_ref);
        self.record("GET", &path, RECEIPTS_PATH)?;
        self.lock()
            .receipts
            .get(tx_ref)
            .cloned()
            .ok_or_else(|| ApiError::not_found(RECEIPTS_PATH))
    }

    async fn notifications(&self, email: &str) -> Result<Vec<Notification>, ApiError> {
        self.record("GET", &format!("{}?email={}", NOTIFICATIONS_PATH, email), NOTIFICATIONS_PATH)?;
        Ok(self.lock().notifications.clone())
    }

    async fn respond_to_notification(
        &self,
        id: &str,
        action: NotificationAction,
    ) -> Result<(), ApiError> {
        let path = format!("{}/{}/{}", NOTIFICATIONS_PATH, id, action.as_str());
        self.record("POST", &path, NOTIFICATIONS_PATH)?;
        let mut state = self.lock();
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.status = Some(format!("{}ed", action.as_str()));
                Ok(())
            }
            None => Err(ApiError::not_found(NOTIFICATIONS_PATH)),
        }
    }

    async fn send_swap_request(&self, _request: &SwapRequest) -> Result<(), ApiError> {
        self.record("POST", SWAP_REQUESTS_PATH, SWAP_REQUESTS_PATH)
    }
}
