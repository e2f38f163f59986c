//! Listing drafts: the in-progress representation of a post being composed
//! across the wizard steps, plus its persistence.

pub mod repository;
pub mod store;

pub use repository::{DraftRepository, FileRepository, MemoryRepository, StoreError};
pub use store::DraftStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of listing being drafted. Each kind owns exactly one draft slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Item,
    Service,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Item => "item",
            PostType::Service => "service",
        }
    }

    /// Storage key of the draft slot for this post type
    pub fn draft_key(&self) -> String {
        format!("draft-{}", self.as_str())
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "item" | "items" => Ok(PostType::Item),
            "service" | "services" => Ok(PostType::Service),
            other => Err(format!("unknown post type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    #[default]
    Draft,
    Published,
}

/// How a service is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    Fixed,
    Hourly,
    Negotiable,
}

impl PricingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingType::Fixed => "fixed",
            PricingType::Hourly => "hourly",
            PricingType::Negotiable => "negotiable",
        }
    }
}

/// What the poster is willing to take in exchange
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradePreferences {
    pub open_to_offers: bool,
    pub accept_cash: bool,
    pub preferred_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_value: Option<f64>,
}

/// An attached image. Order in `Draft::images` is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ImageRepr")]
pub struct DraftImage {
    pub url: String,
    pub is_main: bool,
}

impl DraftImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_main: false,
        }
    }
}

/// Images arrive either as bare URLs or as full objects
#[derive(Deserialize)]
#[serde(untagged)]
enum ImageRepr {
    Url(String),
    #[serde(rename_all = "camelCase")]
    Full {
        url: String,
        #[serde(default)]
        is_main: bool,
    },
}

impl From<ImageRepr> for DraftImage {
    fn from(repr: ImageRepr) -> Self {
        match repr {
            ImageRepr::Url(url) => DraftImage::new(url),
            ImageRepr::Full { url, is_main } => DraftImage { url, is_main },
        }
    }
}

/// Accept both `"1200"` and `1200` for numeric form inputs, keeping the raw
/// text so step validation can report malformed values.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// In-progress listing. Every field is optional at rest so partially filled
/// steps can always be saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    // Item fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specifications: BTreeMap<String, String>,

    // Service fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_type: Option<PricingType>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,

    // Contact details collected on the basic-info step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcity: Option<String>,

    #[serde(default)]
    pub trade_preferences: TradePreferences,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<DraftImage>,
    #[serde(default)]
    pub status: DraftStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Shallow-merge a partial update: keys present in `patch` overwrite,
    /// keys absent keep their current value, `null` clears a field.
    pub fn merged(&self, patch: &DraftPatch) -> Result<Draft, serde_json::Error> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in &patch.0 {
            if value.is_null() {
                object.remove(key);
            } else {
                object.insert(key.clone(), value.clone());
            }
        }

        serde_json::from_value(Value::Object(object))
    }

    /// Position of the cover: the first image flagged main, else the first image
    pub fn cover_index(&self) -> Option<usize> {
        if self.images.is_empty() {
            return None;
        }
        Some(self.images.iter().position(|img| img.is_main).unwrap_or(0))
    }

    pub fn cover_image(&self) -> Option<&DraftImage> {
        self.images.get(self.cover_index()?)
    }

    /// Price parsed as a number, if present and numeric
    pub fn price_value(&self) -> Option<f64> {
        parse_amount(self.price.as_deref()?)
    }

    /// Service rate parsed as a number, if present and numeric
    pub fn rate_value(&self) -> Option<f64> {
        parse_amount(self.rate.as_deref()?)
    }
}

/// Parse a user-entered amount, tolerating thousands separators
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A partial draft: a JSON object whose keys use the draft's camelCase names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftPatch(pub Map<String, Value>);

impl DraftPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Patch that writes every field of `draft`, clearing fields it leaves unset
    pub fn from_draft(draft: &Draft) -> Result<Self, serde_json::Error> {
        let mut map = match serde_json::to_value(draft)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        // Absent optional fields must clear the stored value
        for key in DRAFT_FIELDS {
            map.entry((*key).to_string()).or_insert(Value::Null);
        }
        Ok(Self(map))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `key=value` pairs as given on the command line. Values that parse
    /// as JSON (numbers, booleans, arrays, objects) keep their type.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patch = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_string()));
            patch.0.insert(key.trim().to_string(), value);
        }
        Ok(patch)
    }
}

/// Serialized names of every draft field that may be cleared by a patch
const DRAFT_FIELDS: &[&str] = &[
    "title",
    "description",
    "category",
    "subcategory",
    "condition",
    "price",
    "brand",
    "model",
    "specifications",
    "pricingType",
    "rate",
    "availability",
    "experience",
    "contactEmail",
    "contactPhone",
    "city",
    "subcity",
    "images",
];

/// Record of the most recently published post, shown on the success screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPreview {
    pub post_id: String,
    pub post_type: PostType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl PublishedPreview {
    pub fn from_draft(post_id: impl Into<String>, post_type: PostType, draft: &Draft) -> Self {
        Self {
            post_id: post_id.into(),
            post_type,
            title: draft.title.clone().unwrap_or_default(),
            image: draft.cover_image().map(|img| img.url.clone()),
            published_at: Utc::now(),
        }
    }

    /// Whether the record is still within its time box
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.published_at) <= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_type_parse() {
        assert_eq!("item".parse::<PostType>().unwrap(), PostType::Item);
        assert_eq!("Services".parse::<PostType>().unwrap(), PostType::Service);
        assert!("vehicle".parse::<PostType>().is_err());
        assert_eq!(PostType::Service.draft_key(), "draft-service");
    }

    #[test]
    fn test_merge_keeps_unrelated_fields() {
        let draft = Draft::default()
            .merged(&DraftPatch::new().set("title", "Lamp"))
            .unwrap();
        let draft = draft
            .merged(&DraftPatch::new().set("city", "Addis Ababa"))
            .unwrap();

        assert_eq!(draft.title.as_deref(), Some("Lamp"));
        assert_eq!(draft.city.as_deref(), Some("Addis Ababa"));
    }

    #[test]
    fn test_merge_null_clears_field() {
        let draft = Draft {
            subcategory: Some("lighting".to_string()),
            ..Default::default()
        };
        let merged = draft
            .merged(&DraftPatch::new().set("subcategory", Value::Null))
            .unwrap();
        assert!(merged.subcategory.is_none());
    }

    #[test]
    fn test_merge_rejects_wrong_shape() {
        let patch = DraftPatch::new().set("images", json!({"not": "a list"}));
        assert!(Draft::default().merged(&patch).is_err());
    }

    #[test]
    fn test_images_accept_bare_urls() {
        let draft: Draft = serde_json::from_value(json!({
            "images": ["a.png", {"url": "b.png", "isMain": true}]
        }))
        .unwrap();

        assert_eq!(draft.images.len(), 2);
        assert!(!draft.images[0].is_main);
        assert_eq!(draft.cover_image().unwrap().url, "b.png");
    }

    #[test]
    fn test_cover_defaults_to_first_image() {
        let draft = Draft {
            images: vec![DraftImage::new("a.png"), DraftImage::new("b.png")],
            ..Default::default()
        };
        assert_eq!(draft.cover_image().unwrap().url, "a.png");
    }

    #[test]
    fn test_price_accepts_number_or_text() {
        let draft: Draft = serde_json::from_value(json!({"price": 1200})).unwrap();
        assert_eq!(draft.price.as_deref(), Some("1200"));
        assert_eq!(draft.price_value(), Some(1200.0));

        let draft: Draft = serde_json::from_value(json!({"price": "1,500.50"})).unwrap();
        assert_eq!(draft.price_value(), Some(1500.5));

        let draft: Draft = serde_json::from_value(json!({"price": "cheap"})).unwrap();
        assert_eq!(draft.price_value(), None);
    }

    #[test]
    fn test_patch_from_pairs() {
        let patch =
            DraftPatch::from_pairs(["title=Desk lamp", "price=350", "images=[\"a.png\"]"]).unwrap();
        assert_eq!(patch.0["title"], json!("Desk lamp"));
        assert_eq!(patch.0["price"], json!(350));
        assert_eq!(patch.0["images"], json!(["a.png"]));

        assert!(DraftPatch::from_pairs(["no-separator"]).is_err());
    }

    #[test]
    fn test_patch_from_draft_clears_unset_fields() {
        let stored = Draft {
            title: Some("Old".to_string()),
            subcategory: Some("lighting".to_string()),
            ..Default::default()
        };
        let working = Draft {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let merged = stored
            .merged(&DraftPatch::from_draft(&working).unwrap())
            .unwrap();
        assert_eq!(merged.title.as_deref(), Some("New"));
        assert!(merged.subcategory.is_none());
    }

    #[test]
    fn test_cover_index() {
        let mut draft = Draft::default();
        assert_eq!(draft.cover_index(), None);

        draft.images = vec![DraftImage::new("a.png"), DraftImage::new("b.png")];
        assert_eq!(draft.cover_index(), Some(0));

        draft.images[1].is_main = true;
        assert_eq!(draft.cover_index(), Some(1));
        assert_eq!(draft.cover_image().unwrap().url, "b.png");
    }

    #[test]
    fn test_preview_freshness() {
        let ttl = chrono::Duration::minutes(5);
        let mut preview = PublishedPreview::from_draft("p1", PostType::Item, &Draft::default());
        let now = Utc::now();

        preview.published_at = now - chrono::Duration::minutes(4);
        assert!(preview.is_fresh(now, ttl));

        preview.published_at = now - chrono::Duration::minutes(6);
        assert!(!preview.is_fresh(now, ttl));
    }
}
