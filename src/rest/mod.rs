//! Local REST API over drafts, the catalog and submission.
//!
//! Lets a browser or script drive the same wizard the CLI does. Designed to
//! run on localhost next to the draft files it edits.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::ApiState;

/// Default port for the REST API server
pub const DEFAULT_PORT: u16 = 7010;

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        // Draft endpoints
        .route(
            "/api/v1/drafts/:post_type",
            get(routes::drafts::get_one)
                .patch(routes::drafts::save)
                .delete(routes::drafts::clear),
        )
        .route(
            "/api/v1/drafts/:post_type/events",
            post(routes::drafts::apply_event),
        )
        .route(
            "/api/v1/drafts/:post_type/steps/:step/validate",
            post(routes::drafts::validate_step),
        )
        .route(
            "/api/v1/drafts/:post_type/submit",
            post(routes::drafts::submit),
        )
        .route("/api/v1/posts/latest", get(routes::posts::latest))
        // Catalog endpoints
        .route(
            "/api/v1/catalog/:post_type/categories",
            get(routes::catalog::categories),
        )
        .route(
            "/api/v1/catalog/:post_type/categories/:category/subcategories",
            get(routes::catalog::subcategories),
        )
        .route(
            "/api/v1/catalog/specifications/:category/:subcategory",
            get(routes::catalog::specifications),
        )
        .route(
            "/api/v1/catalog/specifications/:category/:subcategory/:field/options",
            get(routes::catalog::options),
        )
        // Marketplace endpoints
        .route("/api/v1/listings", get(routes::market::listings))
        .route("/api/v1/plans", get(routes::market::plans))
        .route(
            "/api/v1/payments/:tx_ref/receipt",
            get(routes::market::receipt),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server and run until Ctrl-C
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("REST API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down REST API");
        })
        .await?;

    Ok(())
}
