//! Data Transfer Objects for the REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::{Listing, Listings, Plan, Receipt};
use crate::draft::{Draft, PostType, PublishedPreview};
use crate::schema::FieldError;
use crate::wizard::{Progress, Step};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Stored draft of one post type
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    pub post_type: String,
    /// `null` when nothing has been saved yet
    #[schema(value_type = Option<Object>)]
    pub draft: Option<Draft>,
}

impl DraftResponse {
    pub fn new(post_type: PostType, draft: Option<Draft>) -> Self {
        Self {
            post_type: post_type.to_string(),
            draft,
        }
    }
}

/// Result of validating one wizard step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepValidationResponse {
    pub step: Step,
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<FieldError>,
    pub progress: Progress,
    /// Step to navigate to when valid; absent on the final step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<Step>,
}

/// Preview of the most recently published post
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestPostResponse {
    pub post_id: String,
    pub post_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub published_at: String,
}

impl From<PublishedPreview> for LatestPostResponse {
    fn from(p: PublishedPreview) -> Self {
        Self {
            post_id: p.post_id,
            post_type: p.post_type.to_string(),
            title: p.title,
            image: p.image,
            published_at: p.published_at.to_rfc3339(),
        }
    }
}

/// A specification field of a subcategory
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecificationResponse {
    pub name: String,
    /// Options of an independent field; dependent fields list none here
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<Listing> for ListingSummary {
    fn from(l: Listing) -> Self {
        Self {
            id: l.id,
            title: l.title,
            category: l.category,
            price: l.price,
            city: l.city,
            image: l.images.into_iter().next(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingsResponse {
    pub items: Vec<ListingSummary>,
    pub services: Vec<ListingSummary>,
}

impl From<Listings> for ListingsResponse {
    fn from(l: Listings) -> Self {
        Self {
            items: l.items.into_iter().map(ListingSummary::from).collect(),
            services: l.services.into_iter().map(ListingSummary::from).collect(),
        }
    }
}

/// Subscription plan
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration_days: u32,
    /// `null` means unlimited
    pub max_posts: Option<u32>,
    pub features: Vec<String>,
}

/// Payment receipt looked up by transaction reference
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub tx_ref: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub status: String,
    pub plan: Option<String>,
    pub paid_at: Option<String>,
}

impl From<Receipt> for ReceiptResponse {
    fn from(r: Receipt) -> Self {
        Self {
            tx_ref: r.tx_ref,
            amount: r.amount,
            currency: r.currency,
            status: r.status,
            plan: r.plan,
            paid_at: r.paid_at,
        }
    }
}

impl From<Plan> for PlanResponse {
    fn from(p: Plan) -> Self {
        Self {
            id: p.id,
            name: p.name,
            price: p.price,
            duration_days: p.duration_days,
            max_posts: p.max_posts,
            features: p.features,
        }
    }
}
