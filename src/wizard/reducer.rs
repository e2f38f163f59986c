//! Pure draft reducer: `(draft, event) -> draft`.
//!
//! Changing an upstream selection clears the selections that depend on it
//! within the same transition:
//! - category → subcategory, specifications, brand, model
//! - subcategory → specifications, brand, model
//! - a parent specification (Brand/Make) → its dependent specifications (Model)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::catalog::Catalog;
use crate::draft::{Draft, DraftImage, DraftPatch, TradePreferences};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReduceError {
    #[error("at most {0} images are allowed")]
    TooManyImages(usize),

    #[error("no image at position {0}")]
    ImageIndexOutOfRange(usize),

    #[error("image URL must not be empty")]
    EmptyImageUrl,

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Limits applied while reducing
#[derive(Debug, Clone, Copy)]
pub struct DraftLimits {
    pub max_images: usize,
}

impl Default for DraftLimits {
    fn default() -> Self {
        Self { max_images: 5 }
    }
}

/// A single form interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DraftEvent {
    /// Set a plain field by its serialized name (e.g. `title`, `price`)
    SetField {
        field: String,
        #[schema(value_type = Object)]
        value: Value,
    },
    SelectCategory { category: String },
    SelectSubcategory { subcategory: String },
    SetSpecification { name: String, value: String },
    SetTradePreferences {
        #[schema(value_type = Object)]
        preferences: TradePreferences,
    },
    SetLocation {
        city: String,
        #[serde(default)]
        subcity: Option<String>,
    },
    AddImage { url: String },
    RemoveImage { index: usize },
    SetMainImage { index: usize },
}

/// Apply `event` to `state`, returning the new draft. `state` is untouched.
pub fn reduce(state: &Draft, event: &DraftEvent, limits: &DraftLimits) -> Result<Draft, ReduceError> {
    let mut next = state.clone();

    match event {
        DraftEvent::SetField { field, value } => {
            return set_field(state, field, value, limits);
        }
        DraftEvent::SelectCategory { category } => select_category(&mut next, category),
        DraftEvent::SelectSubcategory { subcategory } => select_subcategory(&mut next, subcategory),
        DraftEvent::SetSpecification { name, value } => set_specification(&mut next, name, value),
        DraftEvent::SetTradePreferences { preferences } => {
            next.trade_preferences = preferences.clone();
        }
        DraftEvent::SetLocation { city, subcity } => {
            let city = non_blank(city);
            if city != next.city && subcity.is_none() {
                next.subcity = None;
            }
            next.city = city;
            if let Some(subcity) = subcity {
                next.subcity = non_blank(subcity);
            }
        }
        DraftEvent::AddImage { url } => {
            let url = url.trim();
            if url.is_empty() {
                return Err(ReduceError::EmptyImageUrl);
            }
            if next.images.len() >= limits.max_images {
                return Err(ReduceError::TooManyImages(limits.max_images));
            }
            next.images.push(DraftImage::new(url));
            ensure_cover(&mut next);
        }
        DraftEvent::RemoveImage { index } => {
            if *index >= next.images.len() {
                return Err(ReduceError::ImageIndexOutOfRange(*index));
            }
            next.images.remove(*index);
            ensure_cover(&mut next);
        }
        DraftEvent::SetMainImage { index } => {
            if *index >= next.images.len() {
                return Err(ReduceError::ImageIndexOutOfRange(*index));
            }
            for (i, image) in next.images.iter_mut().enumerate() {
                image.is_main = i == *index;
            }
        }
    }

    Ok(next)
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn clear_selection_details(draft: &mut Draft) {
    draft.specifications.clear();
    draft.brand = None;
    draft.model = None;
}

fn select_category(draft: &mut Draft, category: &str) {
    let category = non_blank(category);
    if draft.category == category {
        return;
    }
    draft.category = category;
    draft.subcategory = None;
    clear_selection_details(draft);
}

fn select_subcategory(draft: &mut Draft, subcategory: &str) {
    let subcategory = non_blank(subcategory);
    if draft.subcategory == subcategory {
        return;
    }
    draft.subcategory = subcategory;
    clear_selection_details(draft);
}

fn set_specification(draft: &mut Draft, name: &str, value: &str) {
    let value = non_blank(value);
    let previous = draft.specifications.get(name).cloned();
    if previous == value {
        return;
    }

    match &value {
        Some(v) => {
            draft.specifications.insert(name.to_string(), v.clone());
        }
        None => {
            draft.specifications.remove(name);
        }
    }

    if name.eq_ignore_ascii_case("brand") || name.eq_ignore_ascii_case("make") {
        draft.brand = value;
    } else if name.eq_ignore_ascii_case("model") {
        draft.model = value;
    }

    let (Some(category), Some(subcategory)) = (&draft.category, &draft.subcategory) else {
        return;
    };
    let dependents = Catalog::builtin().dependent_fields(category, subcategory, name);
    for dependent in dependents {
        draft.specifications.remove(&dependent);
        if dependent.eq_ignore_ascii_case("model") {
            draft.model = None;
        }
    }
}

fn set_field(
    state: &Draft,
    field: &str,
    value: &Value,
    limits: &DraftLimits,
) -> Result<Draft, ReduceError> {
    let text = || value.as_str().unwrap_or_default().to_string();

    // Structured fields go through their own transitions so cascades still apply
    let routed = match field {
        "category" => Some(DraftEvent::SelectCategory { category: text() }),
        "subcategory" => Some(DraftEvent::SelectSubcategory { subcategory: text() }),
        "brand" => Some(DraftEvent::SetSpecification {
            name: "Brand".to_string(),
            value: text(),
        }),
        "model" => Some(DraftEvent::SetSpecification {
            name: "Model".to_string(),
            value: text(),
        }),
        _ => None,
    };
    if let Some(event) = routed {
        return reduce(state, &event, limits);
    }

    let next = state
        .merged(&DraftPatch::new().set(field, value.clone()))
        .map_err(|e| ReduceError::InvalidValue {
            field: field.to_string(),
            message: e.to_string(),
        })?;

    if next.images.len() > limits.max_images {
        return Err(ReduceError::TooManyImages(limits.max_images));
    }
    Ok(next)
}

/// Flag the first image as cover when none is flagged
fn ensure_cover(draft: &mut Draft) {
    if !draft.images.iter().any(|i| i.is_main) {
        if let Some(first) = draft.images.first_mut() {
            first.is_main = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn laptop_draft() -> Draft {
        let limits = DraftLimits::default();
        let events = [
            DraftEvent::SelectCategory {
                category: "electronics".to_string(),
            },
            DraftEvent::SelectSubcategory {
                subcategory: "laptops".to_string(),
            },
            DraftEvent::SetSpecification {
                name: "Brand".to_string(),
                value: "Apple".to_string(),
            },
            DraftEvent::SetSpecification {
                name: "Model".to_string(),
                value: "MacBook Pro".to_string(),
            },
            DraftEvent::SetSpecification {
                name: "RAM".to_string(),
                value: "16GB".to_string(),
            },
        ];
        events.iter().fold(Draft::default(), |draft, event| {
            reduce(&draft, event, &limits).unwrap()
        })
    }

    #[test]
    fn test_category_change_resets_dependents() {
        let draft = laptop_draft();
        assert_eq!(draft.brand.as_deref(), Some("Apple"));
        assert_eq!(draft.specifications.len(), 3);

        let next = reduce(
            &draft,
            &DraftEvent::SelectCategory {
                category: "home".to_string(),
            },
            &DraftLimits::default(),
        )
        .unwrap();

        assert_eq!(next.category.as_deref(), Some("home"));
        assert!(next.subcategory.is_none());
        assert!(next.specifications.is_empty());
        assert!(next.brand.is_none());
        assert!(next.model.is_none());
        // Input untouched
        assert_eq!(draft.subcategory.as_deref(), Some("laptops"));
    }

    #[test]
    fn test_same_category_is_noop() {
        let draft = laptop_draft();
        let next = reduce(
            &draft,
            &DraftEvent::SelectCategory {
                category: "electronics".to_string(),
            },
            &DraftLimits::default(),
        )
        .unwrap();
        assert_eq!(next, draft);
    }

    #[test]
    fn test_subcategory_change_clears_specifications() {
        let draft = laptop_draft();
        let next = reduce(
            &draft,
            &DraftEvent::SelectSubcategory {
                subcategory: "phones".to_string(),
            },
            &DraftLimits::default(),
        )
        .unwrap();
        assert_eq!(next.category.as_deref(), Some("electronics"));
        assert_eq!(next.subcategory.as_deref(), Some("phones"));
        assert!(next.specifications.is_empty());
    }

    #[test]
    fn test_brand_change_clears_model_only() {
        let draft = laptop_draft();
        let next = reduce(
            &draft,
            &DraftEvent::SetSpecification {
                name: "Brand".to_string(),
                value: "Dell".to_string(),
            },
            &DraftLimits::default(),
        )
        .unwrap();
        assert_eq!(next.brand.as_deref(), Some("Dell"));
        assert!(next.model.is_none());
        assert!(!next.specifications.contains_key("Model"));
        assert_eq!(next.specifications.get("RAM").map(String::as_str), Some("16GB"));
    }

    #[test]
    fn test_set_field_routes_category_through_cascade() {
        let draft = laptop_draft();
        let next = reduce(
            &draft,
            &DraftEvent::SetField {
                field: "category".to_string(),
                value: json!("vehicles"),
            },
            &DraftLimits::default(),
        )
        .unwrap();
        assert!(next.subcategory.is_none());
        assert!(next.specifications.is_empty());
    }

    #[test]
    fn test_set_field_plain_value() {
        let next = reduce(
            &Draft::default(),
            &DraftEvent::SetField {
                field: "price".to_string(),
                value: json!(4500),
            },
            &DraftLimits::default(),
        )
        .unwrap();
        assert_eq!(next.price.as_deref(), Some("4500"));
    }

    #[test]
    fn test_set_field_bad_shape() {
        let result = reduce(
            &Draft::default(),
            &DraftEvent::SetField {
                field: "pricingType".to_string(),
                value: json!("bartered"),
            },
            &DraftLimits::default(),
        );
        assert!(matches!(result, Err(ReduceError::InvalidValue { .. })));
    }

    #[test]
    fn test_images_cover_and_limit() {
        let limits = DraftLimits { max_images: 2 };
        let add = |d: &Draft, url: &str| {
            reduce(
                d,
                &DraftEvent::AddImage {
                    url: url.to_string(),
                },
                &limits,
            )
        };

        let draft = add(&Draft::default(), "a.png").unwrap();
        assert!(draft.images[0].is_main);
        let draft = add(&draft, "b.png").unwrap();
        assert!(!draft.images[1].is_main);

        assert_eq!(add(&draft, "c.png"), Err(ReduceError::TooManyImages(2)));
        assert_eq!(add(&Draft::default(), "  "), Err(ReduceError::EmptyImageUrl));
    }

    #[test]
    fn test_removing_cover_promotes_next() {
        let limits = DraftLimits::default();
        let mut draft = Draft::default();
        for url in ["a.png", "b.png", "c.png"] {
            draft = reduce(
                &draft,
                &DraftEvent::AddImage {
                    url: url.to_string(),
                },
                &limits,
            )
            .unwrap();
        }
        let draft = reduce(&draft, &DraftEvent::SetMainImage { index: 1 }, &limits).unwrap();
        assert_eq!(draft.cover_image().unwrap().url, "b.png");

        let draft = reduce(&draft, &DraftEvent::RemoveImage { index: 1 }, &limits).unwrap();
        assert_eq!(draft.images.len(), 2);
        assert_eq!(draft.cover_image().unwrap().url, "a.png");
        assert!(draft.images[0].is_main);

        assert_eq!(
            reduce(&draft, &DraftEvent::RemoveImage { index: 9 }, &limits),
            Err(ReduceError::ImageIndexOutOfRange(9))
        );
    }

    #[test]
    fn test_city_change_resets_subcity() {
        let limits = DraftLimits::default();
        let draft = reduce(
            &Draft::default(),
            &DraftEvent::SetLocation {
                city: "Addis Ababa".to_string(),
                subcity: Some("Bole".to_string()),
            },
            &limits,
        )
        .unwrap();
        assert_eq!(draft.subcity.as_deref(), Some("Bole"));

        let moved = reduce(
            &draft,
            &DraftEvent::SetLocation {
                city: "Hawassa".to_string(),
                subcity: None,
            },
            &limits,
        )
        .unwrap();
        assert!(moved.subcity.is_none());
    }

    #[test]
    fn test_trade_preferences_replace_previous() {
        let limits = DraftLimits::default();
        let event: DraftEvent = serde_json::from_value(json!({
            "type": "setTradePreferences",
            "preferences": {
                "openToOffers": true,
                "acceptCash": true,
                "preferredCategories": ["electronics"],
                "cashValue": 1500.0
            }
        }))
        .unwrap();
        let draft = reduce(&laptop_draft(), &event, &limits).unwrap();

        let prefs = &draft.trade_preferences;
        assert!(prefs.open_to_offers && prefs.accept_cash);
        assert_eq!(prefs.preferred_categories, vec!["electronics".to_string()]);
        assert_eq!(prefs.cash_value, Some(1500.0));
        assert!(prefs.specific_items.is_none());
        assert_eq!(draft.brand.as_deref(), Some("Apple"));

        let cleared = reduce(
            &draft,
            &DraftEvent::SetTradePreferences {
                preferences: TradePreferences::default(),
            },
            &limits,
        )
        .unwrap();
        assert_eq!(cleared.trade_preferences, TradePreferences::default());
        assert_eq!(cleared.specifications, draft.specifications);
    }

    #[test]
    fn test_event_wire_format() {
        let event: DraftEvent = serde_json::from_value(json!({
            "type": "setSpecification",
            "name": "Brand",
            "value": "Apple"
        }))
        .unwrap();
        assert_eq!(
            event,
            DraftEvent::SetSpecification {
                name: "Brand".to_string(),
                value: "Apple".to_string()
            }
        );
    }
}
