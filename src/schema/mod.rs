//! Declarative validation rules, one schema per post type.
//!
//! The same rule set serves per-step validation in the wizard and the
//! final completeness gate of the submission pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use crate::catalog::Catalog;
use crate::draft::{parse_amount, Draft, PostType};
use crate::wizard::Step;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{6,16}[0-9]$").expect("phone pattern is valid"));

pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All field errors found in one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Whether `field` has at least one error
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

/// Draft fields addressed by validation rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Category,
    Subcategory,
    Condition,
    Price,
    PricingType,
    Rate,
    ContactEmail,
    ContactPhone,
    City,
    Subcity,
    Images,
    CashValue,
}

impl Field {
    /// Serialized (camelCase) field name
    pub fn name(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::Category => "category",
            Field::Subcategory => "subcategory",
            Field::Condition => "condition",
            Field::Price => "price",
            Field::PricingType => "pricingType",
            Field::Rate => "rate",
            Field::ContactEmail => "contactEmail",
            Field::ContactPhone => "contactPhone",
            Field::City => "city",
            Field::Subcity => "subcity",
            Field::Images => "images",
            Field::CashValue => "tradePreferences.cashValue",
        }
    }

    /// Text value of the field, blank strings treated as absent
    fn text(&self, draft: &Draft) -> Option<String> {
        let value = match self {
            Field::Title => draft.title.clone(),
            Field::Description => draft.description.clone(),
            Field::Category => draft.category.clone(),
            Field::Subcategory => draft.subcategory.clone(),
            Field::Condition => draft.condition.clone(),
            Field::Price => draft.price.clone(),
            Field::PricingType => draft.pricing_type.map(|p| p.as_str().to_string()),
            Field::Rate => draft.rate.clone(),
            Field::ContactEmail => draft.contact_email.clone(),
            Field::ContactPhone => draft.contact_phone.clone(),
            Field::City => draft.city.clone(),
            Field::Subcity => draft.subcity.clone(),
            Field::Images => draft.images.first().map(|i| i.url.clone()),
            Field::CashValue => draft.trade_preferences.cash_value.map(|v| v.to_string()),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Constraint applied to a field
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Field must be present and non-blank
    Required,
    /// When present, must parse as a number
    Numeric,
    /// When present, must be a number greater than zero
    Positive,
    /// When present, must not exceed this many characters
    MaxLength(usize),
    Email,
    Phone,
    /// When present, must be a category offered for the post type
    KnownCategory,
    /// When present, must be a subcategory of the chosen category
    KnownSubcategory,
    /// When present, must be a known item condition
    KnownCondition,
    /// Image count bounds
    ImageCount { min: usize, max: usize },
}

/// Rules for one field, checked on one wizard step
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: Field,
    pub step: Step,
    pub rules: Vec<Rule>,
}

impl FieldRule {
    fn new(field: Field, step: Step, rules: Vec<Rule>) -> Self {
        Self { field, step, rules }
    }
}

/// Validation schema for one post type
#[derive(Debug, Clone)]
pub struct PostSchema {
    pub post_type: PostType,
    pub rules: Vec<FieldRule>,
}

impl PostSchema {
    /// Schema for `post_type` allowing at most `max_images` images
    pub fn for_type(post_type: PostType, max_images: usize) -> Self {
        use Rule::*;

        let mut rules = vec![
            FieldRule::new(Field::Title, Step::BasicInfo, vec![Required, MaxLength(TITLE_MAX_LEN)]),
            FieldRule::new(
                Field::Description,
                Step::BasicInfo,
                vec![MaxLength(DESCRIPTION_MAX_LEN)],
            ),
            FieldRule::new(Field::Category, Step::BasicInfo, vec![Required, KnownCategory]),
            FieldRule::new(
                Field::Subcategory,
                Step::BasicInfo,
                vec![Required, KnownSubcategory],
            ),
            FieldRule::new(Field::ContactEmail, Step::BasicInfo, vec![Email]),
            FieldRule::new(Field::ContactPhone, Step::BasicInfo, vec![Phone]),
            FieldRule::new(
                Field::Images,
                Step::BasicInfo,
                vec![ImageCount {
                    min: 1,
                    max: max_images,
                }],
            ),
        ];

        match post_type {
            PostType::Item => {
                rules.push(FieldRule::new(
                    Field::Condition,
                    Step::Specifications,
                    vec![KnownCondition],
                ));
                rules.push(FieldRule::new(Field::Price, Step::Specifications, vec![Numeric]));
            }
            PostType::Service => {
                rules.push(FieldRule::new(Field::PricingType, Step::Pricing, vec![Required]));
                rules.push(FieldRule::new(Field::Rate, Step::Pricing, vec![Required, Positive]));
            }
        }

        rules.push(FieldRule::new(
            Field::CashValue,
            Step::TradePreferences,
            vec![Positive],
        ));
        rules.push(FieldRule::new(Field::City, Step::Location, vec![Required]));
        rules.push(FieldRule::new(Field::Subcity, Step::Location, vec![Required]));

        Self { post_type, rules }
    }

    /// Validate only the rules attached to `step`
    pub fn validate_step(&self, step: Step, draft: &Draft) -> Result<(), ValidationErrors> {
        self.run(draft, self.rules.iter().filter(|r| r.step == step))
    }

    /// Validate every rule; a draft passing this is submittable
    pub fn validate_complete(&self, draft: &Draft) -> Result<(), ValidationErrors> {
        self.run(draft, self.rules.iter())
    }

    pub fn is_submittable(&self, draft: &Draft) -> bool {
        self.validate_complete(draft).is_ok()
    }

    fn run<'a>(
        &self,
        draft: &Draft,
        rules: impl Iterator<Item = &'a FieldRule>,
    ) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        for field_rule in rules {
            for rule in &field_rule.rules {
                if let Some(message) = self.check(field_rule.field, rule, draft) {
                    errors.push(FieldError {
                        field: field_rule.field.name().to_string(),
                        message,
                    });
                    // One message per field is enough for a form
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { errors })
        }
    }

    fn check(&self, field: Field, rule: &Rule, draft: &Draft) -> Option<String> {
        if let Rule::ImageCount { min, max } = rule {
            let count = draft.images.len();
            return if count < *min {
                Some(format!("Add at least {} image", min))
            } else if count > *max {
                Some(format!("At most {} images are allowed", max))
            } else {
                None
            };
        }

        let value = field.text(draft);
        if matches!(rule, Rule::Required) {
            return value.is_none().then(|| "This field is required".to_string());
        }

        // Remaining rules only constrain values that are present
        let value = value?;
        let value = value.trim();
        let catalog = Catalog::builtin();

        match rule {
            Rule::Numeric => parse_amount(value)
                .is_none()
                .then(|| "Must be a number".to_string()),
            Rule::Positive => match parse_amount(value) {
                Some(v) if v > 0.0 => None,
                Some(_) => Some("Must be greater than zero".to_string()),
                None => Some("Must be a number".to_string()),
            },
            Rule::MaxLength(max) => (value.chars().count() > *max)
                .then(|| format!("Must be at most {} characters", max)),
            Rule::Email => (!EMAIL_RE.is_match(value))
                .then(|| "Enter a valid email address".to_string()),
            Rule::Phone => (!PHONE_RE.is_match(value))
                .then(|| "Enter a valid phone number".to_string()),
            Rule::KnownCategory => (!catalog.has_category(self.post_type, value))
                .then(|| format!("Unknown category '{}'", value)),
            Rule::KnownSubcategory => {
                let category = draft.category.as_deref().unwrap_or_default();
                (!catalog.has_subcategory(self.post_type, category, value))
                    .then(|| format!("'{}' is not a subcategory of '{}'", value, category))
            }
            Rule::KnownCondition => (!catalog.conditions().iter().any(|c| c == value))
                .then(|| format!("Unknown condition '{}'", value)),
            Rule::Required | Rule::ImageCount { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DraftImage, PricingType};

    fn complete_item() -> Draft {
        Draft {
            title: Some("Lamp".to_string()),
            category: Some("home".to_string()),
            subcategory: Some("lighting".to_string()),
            city: Some("Addis Ababa".to_string()),
            subcity: Some("Bole".to_string()),
            images: vec![DraftImage::new("a.png")],
            ..Default::default()
        }
    }

    fn complete_service() -> Draft {
        Draft {
            title: Some("House cleaning".to_string()),
            category: Some("home-services".to_string()),
            subcategory: Some("cleaning".to_string()),
            pricing_type: Some(PricingType::Hourly),
            rate: Some("250".to_string()),
            city: Some("Addis Ababa".to_string()),
            subcity: Some("Yeka".to_string()),
            images: vec![DraftImage::new("c.png")],
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_item_is_submittable() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        assert!(schema.validate_complete(&complete_item()).is_ok());
    }

    #[test]
    fn test_each_required_item_field() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        for field in ["title", "category", "subcategory", "city", "subcity", "images"] {
            let mut draft = complete_item();
            match field {
                "title" => draft.title = None,
                "category" => draft.category = None,
                "subcategory" => draft.subcategory = None,
                "city" => draft.city = None,
                "subcity" => draft.subcity = None,
                _ => draft.images.clear(),
            }
            let errors = schema.validate_complete(&draft).unwrap_err();
            assert!(errors.has(field), "expected error on {}", field);
        }
    }

    #[test]
    fn test_blank_title_counts_as_missing() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let mut draft = complete_item();
        draft.title = Some("   ".to_string());
        let errors = schema.validate_complete(&draft).unwrap_err();
        assert_eq!(errors.fields(), vec!["title"]);
    }

    #[test]
    fn test_service_needs_pricing_and_positive_rate() {
        let schema = PostSchema::for_type(PostType::Service, 5);
        assert!(schema.validate_complete(&complete_service()).is_ok());

        let mut draft = complete_service();
        draft.pricing_type = None;
        assert!(schema.validate_complete(&draft).unwrap_err().has("pricingType"));

        let mut draft = complete_service();
        draft.rate = Some("0".to_string());
        let errors = schema.validate_complete(&draft).unwrap_err();
        assert_eq!(errors.errors[0].message, "Must be greater than zero");

        let mut draft = complete_service();
        draft.rate = None;
        assert!(schema.validate_complete(&draft).unwrap_err().has("rate"));
    }

    #[test]
    fn test_item_does_not_need_service_fields() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let draft = complete_item();
        assert!(draft.pricing_type.is_none());
        assert!(schema.is_submittable(&draft));
    }

    #[test]
    fn test_image_limit() {
        let schema = PostSchema::for_type(PostType::Item, 2);
        let mut draft = complete_item();
        draft.images = (0..3).map(|i| DraftImage::new(format!("{}.png", i))).collect();
        let errors = schema.validate_complete(&draft).unwrap_err();
        assert_eq!(errors.errors[0].message, "At most 2 images are allowed");
    }

    #[test]
    fn test_step_validation_only_checks_that_step() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let draft = Draft {
            title: Some("Lamp".to_string()),
            category: Some("home".to_string()),
            subcategory: Some("lighting".to_string()),
            images: vec![DraftImage::new("a.png")],
            ..Default::default()
        };

        // Location is still empty, but basic info is fine
        assert!(schema.validate_step(Step::BasicInfo, &draft).is_ok());
        let errors = schema.validate_step(Step::Location, &draft).unwrap_err();
        assert_eq!(errors.fields(), vec!["city", "subcity"]);
    }

    #[test]
    fn test_price_must_be_numeric() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let mut draft = complete_item();
        draft.price = Some("twelve hundred".to_string());
        let errors = schema
            .validate_step(Step::Specifications, &draft)
            .unwrap_err();
        assert_eq!(errors.errors[0].field, "price");

        draft.price = Some("1,200".to_string());
        assert!(schema.validate_step(Step::Specifications, &draft).is_ok());
    }

    #[test]
    fn test_contact_formats() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let mut draft = complete_item();
        draft.contact_email = Some("not-an-email".to_string());
        draft.contact_phone = Some("12".to_string());
        let errors = schema.validate_step(Step::BasicInfo, &draft).unwrap_err();
        assert_eq!(errors.fields(), vec!["contactEmail", "contactPhone"]);

        draft.contact_email = Some("seller@example.com".to_string());
        draft.contact_phone = Some("+251 911 234567".to_string());
        assert!(schema.validate_step(Step::BasicInfo, &draft).is_ok());
    }

    #[test]
    fn test_subcategory_must_belong_to_category() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let mut draft = complete_item();
        draft.subcategory = Some("laptops".to_string());
        let errors = schema.validate_complete(&draft).unwrap_err();
        assert_eq!(errors.fields(), vec!["subcategory"]);
    }

    #[test]
    fn test_title_length_limit() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let mut draft = complete_item();
        draft.title = Some("x".repeat(TITLE_MAX_LEN + 1));
        assert!(schema.validate_complete(&draft).unwrap_err().has("title"));
    }

    #[test]
    fn test_title_length_boundary() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let cases = [(99, true), (100, true), (101, false)];
        for (len, ok) in cases {
            let mut draft = complete_item();
            draft.title = Some("é".repeat(len));
            assert_eq!(
                schema.validate_step(Step::BasicInfo, &draft).is_ok(),
                ok,
                "title of {} characters",
                len
            );
        }
    }

    #[test]
    fn test_cash_value_must_be_positive() {
        let cases = [
            (None, None),
            (Some(100.0), None),
            (Some(0.5), None),
            (Some(0.0), Some("Must be greater than zero")),
            (Some(-5.0), Some("Must be greater than zero")),
        ];
        for post_type in [PostType::Item, PostType::Service] {
            let schema = PostSchema::for_type(post_type, 5);
            for (cash_value, expected) in cases {
                let mut draft = Draft::default();
                draft.trade_preferences.accept_cash = true;
                draft.trade_preferences.cash_value = cash_value;
                let result = schema.validate_step(Step::TradePreferences, &draft);
                match expected {
                    None => assert!(result.is_ok(), "{:?} should pass", cash_value),
                    Some(message) => {
                        let errors = result.unwrap_err();
                        assert_eq!(errors.fields(), vec!["tradePreferences.cashValue"]);
                        assert_eq!(errors.errors[0].message, message);
                    }
                }
            }
        }
    }

    #[test]
    fn test_error_display_joins_fields() {
        let schema = PostSchema::for_type(PostType::Item, 5);
        let errors = schema.validate_complete(&Draft::default()).unwrap_err();
        let text = errors.to_string();
        assert!(text.contains("title: This field is required"));
        assert!(text.contains("images: Add at least 1 image"));
    }
}
