//! Submission pipeline: completeness gate, single create call, success
//! redirect. The draft is only cleared once the backend confirms.

pub mod countdown;

pub use countdown::{CountdownCanceller, CountdownOutcome, RedirectCountdown};

use once_cell::sync::Lazy;
use reqwest::Url;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::api::{ApiError, CreatePostPayload, MarketplaceApi};
use crate::config::{Config, SessionConfig, SubmissionConfig};
use crate::draft::{DraftStore, PostType, PublishedPreview};
use crate::schema::{PostSchema, ValidationErrors};

/// Shown for any remote failure; backend details only go to the log
pub const SUBMIT_FAILURE_MESSAGE: &str =
    "There was a problem submitting your post. Please try again.";

/// Only used to borrow `Url`'s path and query encoding for local routes
static LOCAL_ORIGIN: Lazy<Url> =
    Lazy::new(|| Url::parse("http://swapboard.local/").expect("local origin is a valid URL"));

/// `success_path?id=..&type=..` with both values form-encoded
pub fn success_target(success_path: &str, post_id: &str, post_type: PostType) -> String {
    let mut url = LOCAL_ORIGIN.clone();
    url.set_path(success_path);
    url.query_pairs_mut()
        .append_pair("id", post_id)
        .append_pair("type", post_type.as_str());
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Post is incomplete: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("A submission is already in progress")]
    AlreadySubmitting,

    #[error("Submission failed: {0}")]
    Remote(#[from] ApiError),
}

impl SubmissionError {
    /// Message for the end-user notification
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Validation(errors) => {
                format!("Please complete the highlighted fields: {}", errors.fields().join(", "))
            }
            SubmissionError::AlreadySubmitting => {
                "Your post is already being submitted.".to_string()
            }
            SubmissionError::Remote(_) => SUBMIT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Where the UI goes after a confirmed submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessRedirect {
    /// e.g. `/post/success?id=abc&type=item`
    pub target: String,
    pub post_id: String,
    #[schema(value_type = String)]
    pub post_type: PostType,
    pub countdown_secs: u64,
    /// Route the success screen returns to when the countdown ends
    pub home: String,
}

impl SuccessRedirect {
    /// Countdown back to the home route, plus its cancel handle
    pub fn countdown(&self) -> (RedirectCountdown, CountdownCanceller) {
        RedirectCountdown::new(self.countdown_secs, self.home.clone())
    }
}

/// Resets the in-flight flag however the submission ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Submits the stored draft of one post type
pub struct SubmissionPipeline {
    post_type: PostType,
    store: DraftStore,
    api: Arc<dyn MarketplaceApi>,
    schema: PostSchema,
    session: SessionConfig,
    settings: SubmissionConfig,
    in_flight: AtomicBool,
    state: Mutex<SubmissionState>,
}

impl SubmissionPipeline {
    pub fn new(
        post_type: PostType,
        store: DraftStore,
        api: Arc<dyn MarketplaceApi>,
        config: &Config,
    ) -> Self {
        Self {
            post_type,
            store,
            api,
            schema: PostSchema::for_type(post_type, config.drafts.max_images),
            session: config.session.clone(),
            settings: config.submission.clone(),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: SubmissionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Validate and submit the stored draft.
    ///
    /// On success the draft is cleared and the preview published. On any
    /// failure the draft is left untouched. An incomplete draft leaves the
    /// pipeline `Idle`; a remote failure leaves it `Failed` until the next
    /// attempt starts.
    pub async fn submit(&self) -> Result<SuccessRedirect, SubmissionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(post_type = %self.post_type, "Submit ignored, already in flight");
            return Err(SubmissionError::AlreadySubmitting);
        }
        let _guard = InFlight(&self.in_flight);

        self.set_state(SubmissionState::Validating);
        let draft = self.store.get_draft(self.post_type).unwrap_or_default();
        if let Err(errors) = self.schema.validate_complete(&draft) {
            info!(post_type = %self.post_type, fields = ?errors.fields(), "Submission blocked by validation");
            self.set_state(SubmissionState::Idle);
            return Err(errors.into());
        }

        self.set_state(SubmissionState::Submitting);
        let payload = CreatePostPayload::from_draft(self.post_type, &draft, &self.session);

        let response = match self.api.create_post(self.post_type, &payload).await {
            Ok(response) => response,
            Err(e) => {
                warn!(post_type = %self.post_type, error = %e, "Post submission failed");
                self.set_state(SubmissionState::Failed);
                return Err(e.into());
            }
        };

        let post_id = response.post_id().unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().to_string();
            warn!(post_type = %self.post_type, generated = %id, "Backend returned no post id");
            id
        });

        self.store.clear_draft(self.post_type);
        self.store
            .publish_post(&PublishedPreview::from_draft(&post_id, self.post_type, &draft));
        self.set_state(SubmissionState::Succeeded);

        info!(post_type = %self.post_type, post_id = %post_id, "Post published");

        Ok(SuccessRedirect {
            target: success_target(&self.settings.success_path, &post_id, self.post_type),
            post_id,
            post_type: self.post_type,
            countdown_secs: self.settings.redirect_countdown_secs,
            home: self.settings.home_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketplaceApi;
    use crate::draft::DraftPatch;
    use serde_json::json;
    use std::time::Duration;

    fn lamp_patch() -> DraftPatch {
        DraftPatch::new()
            .set("title", "Lamp")
            .set("category", "home")
            .set("subcategory", "lighting")
            .set("condition", "good")
            .set("price", "350")
            .set("city", "Addis Ababa")
            .set("subcity", "Bole")
            .set("images", json!(["a.png"]))
    }

    fn pipeline(api: MockMarketplaceApi) -> (SubmissionPipeline, DraftStore) {
        let (store, _) = DraftStore::in_memory();
        let pipeline =
            SubmissionPipeline::new(PostType::Item, store.clone(), Arc::new(api), &Config::default());
        (pipeline, store)
    }

    #[tokio::test]
    async fn test_success_clears_draft_and_publishes() {
        let api = MockMarketplaceApi::new().with_post_id(Some("abc"));
        let (pipeline, store) = pipeline(api.clone());
        store.save_draft(PostType::Item, &lamp_patch());

        let redirect = pipeline.submit().await.unwrap();

        assert_eq!(redirect.target, "/post/success?id=abc&type=item");
        assert_eq!(redirect.countdown_secs, 5);
        assert_eq!(pipeline.state(), SubmissionState::Succeeded);
        assert!(store.get_draft(PostType::Item).is_none());
        assert_eq!(store.latest_post().unwrap().post_id, "abc");
        assert_eq!(api.payloads()[0].title, "Lamp");
    }

    #[tokio::test]
    async fn test_incomplete_draft_makes_no_call() {
        let api = MockMarketplaceApi::new();
        let (pipeline, store) = pipeline(api.clone());
        store.save_draft(PostType::Item, &DraftPatch::new().set("title", "Lamp"));

        let err = pipeline.submit().await.unwrap_err();

        assert!(matches!(err, SubmissionError::Validation(_)));
        assert!(api.calls().is_empty());
        assert_eq!(pipeline.state(), SubmissionState::Idle);
        assert!(store.get_draft(PostType::Item).is_some());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_draft() {
        let api = MockMarketplaceApi::new()
            .with_failure("/api/items", ApiError::http("/api/items", 500, "db down"));
        let (pipeline, store) = pipeline(api);
        store.save_draft(PostType::Item, &lamp_patch());

        let err = pipeline.submit().await.unwrap_err();

        assert_eq!(err.user_message(), SUBMIT_FAILURE_MESSAGE);
        assert_eq!(pipeline.state(), SubmissionState::Failed);
        assert_eq!(
            store.get_draft(PostType::Item).unwrap().title.as_deref(),
            Some("Lamp")
        );
        assert!(store.latest_post().is_none());
    }

    #[tokio::test]
    async fn test_retry_leaves_failed_state() {
        let api = MockMarketplaceApi::new()
            .with_post_id(Some("p9"))
            .with_failure("/api/items", ApiError::network("/api/items", "refused"));
        let (pipeline, store) = pipeline(api.clone());
        store.save_draft(PostType::Item, &lamp_patch());

        assert!(pipeline.submit().await.is_err());
        assert_eq!(pipeline.state(), SubmissionState::Failed);

        api.clear_failures();
        let redirect = pipeline.submit().await.unwrap();
        assert_eq!(redirect.post_id, "p9");
        assert_eq!(pipeline.state(), SubmissionState::Succeeded);
    }

    #[test]
    fn test_success_target_encodes_values() {
        let cases = [
            ("abc", "/post/success?id=abc&type=item"),
            ("a b&c", "/post/success?id=a+b%26c&type=item"),
            ("x/y?z=1", "/post/success?id=x%2Fy%3Fz%3D1&type=item"),
        ];
        for (id, expected) in cases {
            assert_eq!(success_target("/post/success", id, PostType::Item), expected, "{id}");
        }
    }

    #[tokio::test]
    async fn test_missing_post_id_is_generated() {
        let (pipeline, store) = pipeline(MockMarketplaceApi::new());
        store.save_draft(PostType::Item, &lamp_patch());

        let redirect = pipeline.submit().await.unwrap();
        assert!(uuid::Uuid::parse_str(&redirect.post_id).is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_submit_rejected() {
        let api = MockMarketplaceApi::new()
            .with_post_id(Some("p1"))
            .with_create_delay(Duration::from_millis(100));
        let (pipeline, store) = pipeline(api.clone());
        store.save_draft(PostType::Item, &lamp_patch());

        let (first, second) = tokio::join!(pipeline.submit(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            pipeline.submit().await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(SubmissionError::AlreadySubmitting)));
        assert_eq!(api.payloads().len(), 1);
    }
}
