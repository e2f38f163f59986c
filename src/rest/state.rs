//! API state management for the REST server.

use std::sync::Arc;

use crate::api::{MarketplaceApi, RemoteClient};
use crate::config::Config;
use crate::draft::{DraftStore, PostType};
use crate::submission::SubmissionPipeline;
use crate::wizard::DraftLimits;

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Draft persistence shared with the pipelines
    pub store: DraftStore,
    /// Marketplace backend
    pub api: Arc<dyn MarketplaceApi>,
    /// One pipeline per post type, so the in-flight guard spans all requests
    item_pipeline: Arc<SubmissionPipeline>,
    service_pipeline: Arc<SubmissionPipeline>,
}

impl ApiState {
    pub fn new(config: Config, store: DraftStore, api: Arc<dyn MarketplaceApi>) -> Self {
        let item_pipeline = Arc::new(SubmissionPipeline::new(
            PostType::Item,
            store.clone(),
            api.clone(),
            &config,
        ));
        let service_pipeline = Arc::new(SubmissionPipeline::new(
            PostType::Service,
            store.clone(),
            api.clone(),
            &config,
        ));

        Self {
            config: Arc::new(config),
            store,
            api,
            item_pipeline,
            service_pipeline,
        }
    }

    /// File-backed drafts and the HTTP marketplace client
    pub fn from_config(config: Config) -> Result<Self, crate::api::ApiError> {
        let store = DraftStore::from_config(&config);
        let api = Arc::new(RemoteClient::from_config(&config)?);
        Ok(Self::new(config, store, api))
    }

    pub fn pipeline(&self, post_type: PostType) -> &SubmissionPipeline {
        match post_type {
            PostType::Item => &self.item_pipeline,
            PostType::Service => &self.service_pipeline,
        }
    }

    pub fn limits(&self) -> DraftLimits {
        DraftLimits {
            max_images: self.config.drafts.max_images,
        }
    }
}
