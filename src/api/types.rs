//! Request and response shapes of the marketplace backend

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::SessionConfig;
use crate::draft::{Draft, PostType, TradePreferences};

fn default_true() -> bool {
    true
}

/// Body sent to the create-item / create-service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostPayload {
    pub post_type: PostType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub subcategory: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,

    pub city: String,
    pub subcity: String,
    /// "Subcity, City" for backends that only store one location string
    pub location: String,

    pub trade_preferences: TradePreferences,
    pub images: Vec<String>,
    pub main_image: String,
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl CreatePostPayload {
    /// Assemble the payload from a validated draft and the session hints.
    /// Missing required text fields become empty strings; callers validate first.
    pub fn from_draft(post_type: PostType, draft: &Draft, session: &SessionConfig) -> Self {
        let city = draft.city.clone().unwrap_or_default();
        let subcity = draft.subcity.clone().unwrap_or_default();
        let location = if subcity.is_empty() {
            city.clone()
        } else {
            format!("{}, {}", subcity, city)
        };

        // Cover first, remaining images in display order; duplicates are kept
        let cover_index = draft.cover_index();
        let cover = draft.cover_image().map(|i| i.url.clone()).unwrap_or_default();
        let mut images = vec![cover.clone()];
        images.extend(
            draft
                .images
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != cover_index)
                .map(|(_, img)| img.url.clone()),
        );
        images.retain(|url| !url.is_empty());

        let (item, service) = match post_type {
            PostType::Item => (true, false),
            PostType::Service => (false, true),
        };

        Self {
            post_type,
            title: draft.title.clone().unwrap_or_default().trim().to_string(),
            description: draft.description.clone(),
            category: draft.category.clone().unwrap_or_default(),
            subcategory: draft.subcategory.clone().unwrap_or_default(),
            condition: draft.condition.clone().filter(|_| item),
            price: draft.price_value().filter(|_| item),
            brand: draft.brand.clone().filter(|_| item),
            model: draft.model.clone().filter(|_| item),
            specifications: if item {
                draft.specifications.clone()
            } else {
                BTreeMap::new()
            },
            pricing_type: draft
                .pricing_type
                .map(|p| p.as_str().to_string())
                .filter(|_| service),
            rate: draft.rate_value().filter(|_| service),
            availability: draft.availability.clone().filter(|_| service),
            experience: draft.experience.clone().filter(|_| service),
            city,
            subcity,
            location,
            trade_preferences: draft.trade_preferences.clone(),
            images,
            main_image: cover,
            status: "published".to_string(),
            contact_email: draft.contact_email.clone().or_else(|| session.email.clone()),
            contact_phone: draft.contact_phone.clone(),
            user_email: session.email.clone(),
            user_name: session.display_name.clone(),
        }
    }
}

/// Response of the create-item / create-service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePostResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "_id", alias = "postId")]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Default for CreatePostResponse {
    fn default() -> Self {
        Self {
            success: true,
            message: None,
            id: None,
            data: None,
        }
    }
}

impl CreatePostResponse {
    /// Identifier assigned by the backend, wherever it put it
    pub fn post_id(&self) -> Option<String> {
        if let Some(id) = self.id.as_ref().filter(|id| !id.is_empty()) {
            return Some(id.clone());
        }
        let data = self.data.as_ref()?;
        ["id", "_id", "postId"]
            .iter()
            .find_map(|key| match data.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Summary of a published listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Items and services fetched together
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Listings {
    pub items: Vec<Listing>,
    pub services: Vec<Listing>,
}

/// Subscription plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub max_posts: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    /// Plans shown when the backend cannot be reached
    pub fn defaults() -> Vec<Plan> {
        vec![
            Plan {
                id: "free".to_string(),
                name: "Free".to_string(),
                price: 0.0,
                duration_days: 30,
                max_posts: Some(3),
                features: vec!["Up to 3 active posts".to_string()],
            },
            Plan {
                id: "basic".to_string(),
                name: "Basic".to_string(),
                price: 199.0,
                duration_days: 30,
                max_posts: Some(15),
                features: vec![
                    "Up to 15 active posts".to_string(),
                    "Swap requests".to_string(),
                ],
            },
            Plan {
                id: "premium".to_string(),
                name: "Premium".to_string(),
                price: 499.0,
                duration_days: 30,
                max_posts: None,
                features: vec![
                    "Unlimited posts".to_string(),
                    "Featured listings".to_string(),
                    "Swap requests".to_string(),
                ],
            },
        ]
    }
}

/// How many posts the user has published and may still publish
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostsStatus {
    pub total_posts: u32,
    pub remaining_posts: Option<u32>,
    pub plan: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitRequest {
    pub amount: f64,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub plan_id: String,
    pub tx_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

impl PaymentInitRequest {
    /// Build a request for `plan` with a fresh transaction reference
    pub fn for_plan(plan: &Plan, email: &str, display_name: &str) -> Self {
        let mut names = display_name.splitn(2, ' ');
        let first_name = names.next().unwrap_or_default().to_string();
        let last_name = names.next().unwrap_or_default().to_string();
        Self {
            amount: plan.price,
            currency: "ETB".to_string(),
            email: email.to_string(),
            first_name,
            last_name,
            plan_id: plan.id.clone(),
            tx_ref: format!("tx-{}", uuid::Uuid::new_v4().simple()),
            return_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitResponse {
    #[serde(default)]
    pub checkout_url: Option<String>,
    pub tx_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    pub tx_ref: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl PaymentVerification {
    pub fn is_paid(&self) -> bool {
        self.status.eq_ignore_ascii_case("success") || self.status.eq_ignore_ascii_case("paid")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_ref: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// Swap or purchase interest addressed to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Accept,
    Reject,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::Accept => "accept",
            NotificationAction::Reject => "reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub requester_email: String,
    pub offered_post_id: String,
    pub target_post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_top_up: Option<f64>,
}
