//! HTTP client for the marketplace backend

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    CreatePostPayload, CreatePostResponse, Listing, Notification, NotificationAction,
    PaymentInitRequest, PaymentInitResponse, PaymentVerification, Plan, PostsStatus, Receipt,
    SwapRequest,
};
use super::MarketplaceApi;
use crate::config::Config;

pub const ITEMS_PATH: &str = "/api/items";
pub const SERVICES_PATH: &str = "/api/services";
pub const PLANS_PATH: &str = "/api/plans";
pub const POSTS_STATUS_PATH: &str = "/api/posts-status";
pub const PAYMENT_INIT_PATH: &str = "/api/payment/initialize";
pub const PAYMENT_VERIFY_PATH: &str = "/api/payment/verify";
pub const RECEIPTS_PATH: &str = "/api/receipts";
pub const NOTIFICATIONS_PATH: &str = "/api/notifications";
pub const SWAP_REQUESTS_PATH: &str = "/api/swap-requests";

const DEFAULT_FAILURE_MESSAGE: &str = "request was not successful";

/// Marketplace backend over HTTP
pub struct RemoteClient {
    base_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl RemoteClient {
    /// Create a client with no outbound timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            client: Client::new(),
        }
    }

    /// Create from config: base URL, optional timeout, session token
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.api.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::network(&config.api.base_url, e.to_string()))?;

        Ok(Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            auth_token: config
                .session
                .auth_token
                .clone()
                .filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` under the base URL, followed by percent-encoded `segments`
    fn endpoint_url(&self, path: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::network(path, format!("invalid URL: {}", e)))?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| ApiError::network(path, "base URL cannot carry a path"))?
                .extend(segments);
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(endpoint, segments)?;
        let request = self.authorized(self.client.get(url).query(query));
        let body = self.send(endpoint, request).await?;
        unwrap_envelope(endpoint, body)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(endpoint, segments)?;
        let request = self.authorized(self.client.post(url).json(body));
        let body = self.send(endpoint, request).await?;
        unwrap_envelope(endpoint, body)
    }

    /// Send a request and return the decoded JSON body of a 2xx response
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        debug!(endpoint, "Marketplace request");

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(endpoint, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(endpoint, status.as_u16(), body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(endpoint, e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::decode(endpoint, e.to_string()))
    }

    async fn create(
        &self,
        path: &str,
        payload: &CreatePostPayload,
    ) -> Result<CreatePostResponse, ApiError> {
        let request = self.authorized(self.client.post(self.endpoint_url(path, &[])?).json(payload));
        let body = self.send(path, request).await?;
        decode_created(path, body)
    }
}

/// A 2xx create with no body still means the post exists; the id is then unknown
fn decode_created(endpoint: &str, body: Value) -> Result<CreatePostResponse, ApiError> {
    check_success(endpoint, &body)?;
    if body.is_null() {
        return Ok(CreatePostResponse::default());
    }
    serde_json::from_value(body).map_err(|e| ApiError::decode(endpoint, e.to_string()))
}

/// Reject bodies carrying `success: false`
fn check_success(endpoint: &str, body: &Value) -> Result<(), ApiError> {
    if body.get("success").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);
        return Err(ApiError::remote(endpoint, message));
    }
    Ok(())
}

/// Decode `{success, data}` envelopes, or the bare body when there is no envelope
fn unwrap_envelope<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, ApiError> {
    check_success(endpoint, &body)?;
    let inner = match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner).map_err(|e| ApiError::decode(endpoint, e.to_string()))
}

#[async_trait]
impl MarketplaceApi for RemoteClient {
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
        self.get(ITEMS_PATH, &[], &[]).await
    }

    async fn list_services(&self) -> Result<Vec<Listing>, ApiError> {
        self.get(SERVICES_PATH, &[], &[]).await
    }

    async fn plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.get(PLANS_PATH, &[], &[]).await
    }

    async fn posts_status(&self, email: &str) -> Result<PostsStatus, ApiError> {
        self.get(POSTS_STATUS_PATH, &[], &[("email", email)]).await
    }

    async fn initialize_payment(
        &self,
        request: &PaymentInitRequest,
    ) -> Result<PaymentInitResponse, ApiError> {
        self.post(PAYMENT_INIT_PATH, &[], request).await
    }

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification, ApiError> {
        self.get(PAYMENT_VERIFY_PATH, &[tx_ref], &[]).await
    }

    async fn receipt(&self, tx_ref: &str) -> Result<Receipt, ApiError> {
        self.get(RECEIPTS_PATH, &[tx_ref], &[]).await
    }

    async fn notifications(&self, email: &str) -> Result<Vec<Notification>, ApiError> {
        self.get(NOTIFICATIONS_PATH, &[], &[("email", email)]).await
    }

    async fn respond_to_notification(
        &self,
        id: &str,
        action: NotificationAction,
    ) -> Result<(), ApiError> {
        let _: Value = self
            .post(NOTIFICATIONS_PATH, &[id, action.as_str()], &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn send_swap_request(&self, request: &SwapRequest) -> Result<(), ApiError> {
        let _: Value = self.post(SWAP_REQUESTS_PATH, &[], request).await?;
        Ok(())
    }
}
