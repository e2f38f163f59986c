//! Draft store: best-effort persistence of one draft per post type plus the
//! short-lived "latest post" preview record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::repository::{DraftRepository, FileRepository, MemoryRepository, StoreError};
use super::{Draft, DraftPatch, PostType, PublishedPreview};
use crate::config::Config;

/// Storage key of the latest published post preview
pub const LATEST_POST_KEY: &str = "latest-post";

/// Default preview lifetime in seconds
pub const DEFAULT_PREVIEW_TTL_SECS: u64 = 300;

/// Spans chrono cannot represent are clamped; such previews never expire
fn preview_ttl(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or_else(|| {
            warn!(preview_ttl_secs = secs, "Preview TTL out of range, clamping");
            chrono::Duration::MAX
        })
}

/// Draft persistence facade. Read failures are reported as "no draft", write
/// failures are logged and dropped.
#[derive(Clone)]
pub struct DraftStore {
    drafts: Arc<dyn DraftRepository<Draft>>,
    previews: Arc<dyn DraftRepository<PublishedPreview>>,
    preview_ttl: chrono::Duration,
}

impl DraftStore {
    pub fn new(
        drafts: Arc<dyn DraftRepository<Draft>>,
        previews: Arc<dyn DraftRepository<PublishedPreview>>,
        preview_ttl_secs: u64,
    ) -> Self {
        Self {
            drafts,
            previews,
            preview_ttl: preview_ttl(preview_ttl_secs),
        }
    }

    /// File-backed store under the configured drafts directory
    pub fn from_config(config: &Config) -> Self {
        let repo = FileRepository::new(config.drafts_path());
        Self::new(
            Arc::new(repo.clone()),
            Arc::new(repo),
            config.drafts.preview_ttl_secs,
        )
    }

    /// Ephemeral store, also returning the backing repository for inspection
    pub fn in_memory() -> (Self, MemoryRepository) {
        let repo = MemoryRepository::new();
        let store = Self::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            DEFAULT_PREVIEW_TTL_SECS,
        );
        (store, repo)
    }

    /// Merge `patch` into the stored draft, creating it if needed
    pub fn try_save_draft(&self, post_type: PostType, patch: &DraftPatch) -> Result<Draft, StoreError> {
        let key = post_type.draft_key();
        let current = self.drafts.get(&key).unwrap_or_else(|e| {
            warn!(post_type = %post_type, error = %e, "Unreadable draft replaced by new save");
            None
        });

        let mut merged = current
            .unwrap_or_default()
            .merged(patch)
            .map_err(|source| StoreError::Serialization {
                key: key.clone(),
                source,
            })?;
        merged.updated_at = Some(Utc::now());

        self.drafts.set(&key, &merged)?;
        debug!(post_type = %post_type, fields = patch.0.len(), "Draft saved");
        Ok(merged)
    }

    /// Best-effort save. Returns the merged draft, or `None` if it could not
    /// be persisted.
    pub fn save_draft(&self, post_type: PostType, patch: &DraftPatch) -> Option<Draft> {
        match self.try_save_draft(post_type, patch) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(post_type = %post_type, error = %e, "Failed to save draft");
                None
            }
        }
    }

    /// Current draft for `post_type`, or `None` if absent or unreadable
    pub fn get_draft(&self, post_type: PostType) -> Option<Draft> {
        match self.drafts.get(&post_type.draft_key()) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(post_type = %post_type, error = %e, "Failed to read draft");
                None
            }
        }
    }

    /// Remove the draft for `post_type`
    pub fn clear_draft(&self, post_type: PostType) {
        if let Err(e) = self.drafts.clear(&post_type.draft_key()) {
            warn!(post_type = %post_type, error = %e, "Failed to clear draft");
        } else {
            debug!(post_type = %post_type, "Draft cleared");
        }
    }

    /// Record the most recently published post for the success screen
    pub fn publish_post(&self, preview: &PublishedPreview) {
        if let Err(e) = self.previews.set(LATEST_POST_KEY, preview) {
            warn!(post_id = %preview.post_id, error = %e, "Failed to store latest post preview");
        }
    }

    /// Latest published post, ignored once older than the preview TTL
    pub fn latest_post(&self) -> Option<PublishedPreview> {
        self.latest_post_at(Utc::now())
    }

    pub fn latest_post_at(&self, now: DateTime<Utc>) -> Option<PublishedPreview> {
        let preview = match self.previews.get(LATEST_POST_KEY) {
            Ok(preview) => preview?,
            Err(e) => {
                warn!(error = %e, "Failed to read latest post preview");
                return None;
            }
        };

        if preview.is_fresh(now, self.preview_ttl) {
            Some(preview)
        } else {
            debug!(post_id = %preview.post_id, "Latest post preview is stale");
            None
        }
    }
}
