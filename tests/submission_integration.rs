//! End-to-end submission tests against a local stub of the marketplace backend
//!
//! Each test starts an axum server on an ephemeral port that records the
//! requests it receives, and keeps drafts in a temporary state directory.
//!
//! ```bash
//! cargo test --test submission_integration -- --nocapture
//! ```

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use swapboard::api::{fetch_listings, MarketplaceApi, RemoteClient};
use swapboard::config::Config;
use swapboard::draft::{DraftPatch, DraftStore, PostType};
use swapboard::submission::{SubmissionError, SubmissionPipeline, SUBMIT_FAILURE_MESSAGE};
use swapboard::wizard::{DraftEvent, DraftLimits, Step, WizardSession};

// ─── Stub backend ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Mode {
    /// 201 with `{success: true, data: {id}}`
    Accept,
    /// 200 with `{success: false}`
    Reject,
    /// 500
    Fail,
    /// 201 with no body at all
    Empty,
}

#[derive(Clone)]
struct Backend {
    mode: Arc<Mutex<Mode>>,
    received: Arc<Mutex<Vec<Received>>>,
}

#[derive(Clone, Debug)]
struct Received {
    path: String,
    body: Value,
    authorization: Option<String>,
}

impl Backend {
    fn new(mode: Mode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    fn record(&self, path: &str, headers: &HeaderMap, body: Value) -> Response {
        self.received.lock().unwrap().push(Received {
            path: path.to_string(),
            body,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });

        match *self.mode.lock().unwrap() {
            Mode::Accept => (
                StatusCode::CREATED,
                Json(json!({"success": true, "data": {"id": "post-123"}})),
            )
                .into_response(),
            Mode::Reject => (
                StatusCode::OK,
                Json(json!({"success": false, "message": "Post limit reached"})),
            )
                .into_response(),
            Mode::Fail => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "database unavailable"})),
            )
                .into_response(),
            Mode::Empty => StatusCode::CREATED.into_response(),
        }
    }
}

async fn create_item(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("/api/items", &headers, body)
}

async fn create_service(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend.record("/api/services", &headers, body)
}

async fn list_items() -> Json<Value> {
    Json(json!({"success": true, "data": [{"_id": "i1", "title": "Lamp", "price": 350}]}))
}

async fn list_services() -> Json<Value> {
    Json(json!({"success": true, "data": [{"_id": "s1", "title": "Plumbing"}]}))
}

async fn receipt(Path(tx_ref): Path<String>) -> (StatusCode, Json<Value>) {
    if tx_ref.starts_with("tx-known") {
        (
            StatusCode::OK,
            Json(json!({"success": true, "data": {"txRef": tx_ref, "amount": 199, "status": "paid"}})),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"success": false})))
    }
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/items", post(create_item).get(list_items))
        .route("/api/services", post(create_service).get(list_services))
        .route("/api/receipts/:tx_ref", get(receipt))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

// ─── Test Context ─────────────────────────────────────────────────────────────

struct TestContext {
    _temp_dir: TempDir,
    config: Config,
    backend: Backend,
}

impl TestContext {
    async fn new(mode: Mode) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = Backend::new(mode);
        let base_url = spawn_backend(backend.clone()).await;

        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config.api.base_url = base_url;
        config.session.email = Some("seller@example.com".to_string());
        config.session.auth_token = Some("token-abc".to_string());

        Self {
            _temp_dir: temp_dir,
            config,
            backend,
        }
    }

    fn store(&self) -> DraftStore {
        DraftStore::from_config(&self.config)
    }

    fn pipeline(&self, post_type: PostType) -> SubmissionPipeline {
        let client = RemoteClient::from_config(&self.config).expect("client");
        SubmissionPipeline::new(post_type, self.store(), Arc::new(client), &self.config)
    }

    fn draft_file(&self, post_type: PostType) -> std::path::PathBuf {
        self.config
            .drafts_path()
            .join(format!("{}.json", post_type.draft_key()))
    }
}

/// Walk an item draft through every wizard step, one process per step
fn compose_lamp(ctx: &TestContext) {
    let limits = DraftLimits::default();

    let mut session = WizardSession::open(ctx.store(), PostType::Item, limits);
    session
        .edit(
            &DraftPatch::new()
                .set("title", "Lamp")
                .set("description", "Brass desk lamp")
                .set("category", "home")
                .set("subcategory", "lighting"),
        )
        .unwrap();
    session
        .apply(&DraftEvent::AddImage {
            url: "https://img.test/lamp.png".to_string(),
        })
        .unwrap();
    assert_eq!(session.next().unwrap().step, Step::Specifications);

    let mut session = WizardSession::open_at(ctx.store(), PostType::Item, limits, Step::Specifications);
    session
        .edit(&DraftPatch::new().set("condition", "good").set("price", "350"))
        .unwrap();
    assert_eq!(session.next().unwrap().step, Step::TradePreferences);

    let mut session =
        WizardSession::open_at(ctx.store(), PostType::Item, limits, Step::TradePreferences);
    assert_eq!(session.next().unwrap().step, Step::Location);

    let mut session = WizardSession::open_at(ctx.store(), PostType::Item, limits, Step::Location);
    session
        .apply(&DraftEvent::SetLocation {
            city: "Addis Ababa".to_string(),
            subcity: Some("Bole".to_string()),
        })
        .unwrap();
    assert_eq!(session.next().unwrap().step, Step::Review);
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lamp_end_to_end() {
    let ctx = TestContext::new(Mode::Accept).await;
    compose_lamp(&ctx);
    assert!(ctx.draft_file(PostType::Item).exists());

    let redirect = ctx.pipeline(PostType::Item).submit().await.unwrap();

    assert_eq!(redirect.post_id, "post-123");
    assert_eq!(redirect.target, "/post/success?id=post-123&type=item");
    assert_eq!(redirect.countdown_secs, 5);

    // Draft cleared, preview available
    assert!(!ctx.draft_file(PostType::Item).exists());
    assert!(ctx.store().get_draft(PostType::Item).is_none());
    let latest = ctx.store().latest_post().unwrap();
    assert_eq!(latest.title, "Lamp");
    assert_eq!(latest.image.as_deref(), Some("https://img.test/lamp.png"));

    let received = ctx.backend.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "/api/items");
    assert_eq!(received[0].body["title"], json!("Lamp"));
    assert_eq!(received[0].body["price"], json!(350.0));
    assert_eq!(received[0].body["location"], json!("Bole, Addis Ababa"));
    assert_eq!(received[0].body["userEmail"], json!("seller@example.com"));
    assert_eq!(
        received[0].authorization.as_deref(),
        Some("Bearer token-abc")
    );
}

#[tokio::test]
async fn test_server_error_preserves_draft() {
    let ctx = TestContext::new(Mode::Fail).await;
    compose_lamp(&ctx);

    let err = ctx.pipeline(PostType::Item).submit().await.unwrap_err();

    assert!(matches!(err, SubmissionError::Remote(_)));
    assert_eq!(err.user_message(), SUBMIT_FAILURE_MESSAGE);
    let draft = ctx.store().get_draft(PostType::Item).unwrap();
    assert_eq!(draft.title.as_deref(), Some("Lamp"));
    assert_eq!(draft.subcity.as_deref(), Some("Bole"));
    assert!(ctx.store().latest_post().is_none());
}

#[tokio::test]
async fn test_success_false_preserves_draft() {
    let ctx = TestContext::new(Mode::Reject).await;
    compose_lamp(&ctx);

    let err = ctx.pipeline(PostType::Item).submit().await.unwrap_err();

    match err {
        SubmissionError::Remote(api_err) => {
            assert!(api_err.to_string().contains("Post limit reached"));
        }
        other => panic!("expected remote failure, got {other:?}"),
    }
    assert!(ctx.draft_file(PostType::Item).exists());
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let ctx = TestContext::new(Mode::Fail).await;
    compose_lamp(&ctx);
    let pipeline = ctx.pipeline(PostType::Item);

    assert!(pipeline.submit().await.is_err());
    *ctx.backend.mode.lock().unwrap() = Mode::Accept;
    let redirect = pipeline.submit().await.unwrap();

    assert_eq!(redirect.post_id, "post-123");
    assert_eq!(ctx.backend.received().len(), 2);
}

#[tokio::test]
async fn test_incomplete_draft_never_reaches_backend() {
    let ctx = TestContext::new(Mode::Accept).await;
    ctx.store().save_draft(
        PostType::Service,
        &DraftPatch::new()
            .set("title", "Plumbing")
            .set("category", "home-services")
            .set("subcategory", "plumbing"),
    );

    let err = ctx.pipeline(PostType::Service).submit().await.unwrap_err();

    match err {
        SubmissionError::Validation(errors) => {
            assert!(errors.has("images"));
            assert!(errors.has("rate"));
            assert!(errors.has("city"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(ctx.backend.received().is_empty());
    assert!(ctx.store().get_draft(PostType::Service).is_some());
}

#[tokio::test]
async fn test_fetch_listings_from_backend() {
    let ctx = TestContext::new(Mode::Accept).await;
    let client = RemoteClient::from_config(&ctx.config).unwrap();

    let listings = fetch_listings(&client).await.unwrap();

    assert_eq!(listings.items[0].title, "Lamp");
    assert_eq!(listings.items[0].price, Some(350.0));
    assert_eq!(listings.services[0].id, "s1");
}

#[tokio::test]
async fn test_receipt_lookup() {
    let ctx = TestContext::new(Mode::Accept).await;
    let client = RemoteClient::from_config(&ctx.config).unwrap();

    let receipt = client.receipt("tx-known").await.unwrap();
    assert_eq!(receipt.amount, 199.0);

    let err = client.receipt("tx-missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_receipt_reference_is_one_path_segment() {
    let ctx = TestContext::new(Mode::Accept).await;
    let client = RemoteClient::from_config(&ctx.config).unwrap();

    // Unencoded, the slash would route to a different path and 404
    let receipt = client.receipt("tx-known/2026 #7").await.unwrap();
    assert_eq!(receipt.tx_ref, "tx-known/2026 #7");
}

#[tokio::test]
async fn test_created_without_body_counts_as_published() {
    let ctx = TestContext::new(Mode::Empty).await;
    compose_lamp(&ctx);

    let redirect = ctx.pipeline(PostType::Item).submit().await.unwrap();

    assert!(uuid_like(&redirect.post_id));
    assert!(redirect
        .target
        .starts_with(&format!("/post/success?id={}", redirect.post_id)));
    assert!(ctx.store().get_draft(PostType::Item).is_none());
    assert_eq!(ctx.store().latest_post().unwrap().post_id, redirect.post_id);
    assert_eq!(ctx.backend.received().len(), 1);
}

fn uuid_like(id: &str) -> bool {
    id.len() == 36 && id.chars().filter(|c| *c == '-').count() == 4
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let mut config = Config::default();
    // Port 9 (discard) is closed on test hosts
    config.api.base_url = "http://127.0.0.1:9".to_string();
    config.api.request_timeout_secs = Some(2);

    let client = RemoteClient::from_config(&config).unwrap();

    let err = client.list_items().await.unwrap_err();
    assert!(matches!(err, swapboard::api::ApiError::NetworkError { .. }));
}
