//! Plain-text summary shown on the review step

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde_json::json;

use crate::catalog::Catalog;
use crate::draft::{Draft, PostType};

const REVIEW_TEMPLATE: &str = r"{{title}} ({{post_type}})
Category: {{category}}{{#if subcategory}} / {{subcategory}}{{/if}}
{{#if description}}
{{description}}
{{/if}}
{{#if condition}}Condition: {{condition}}
{{/if}}{{#if price}}Price: {{price}}
{{/if}}{{#if pricing_type}}Pricing: {{pricing_type}}{{#if rate}} at {{rate}}{{/if}}
{{/if}}{{#if availability}}Availability: {{availability}}
{{/if}}{{#if experience}}Experience: {{experience}}
{{/if}}{{#each specifications}}{{@key}}: {{this}}
{{/each}}Location: {{location}}
Images: {{image_count}}{{#if cover}} (cover: {{cover}}){{/if}}
Trade: {{trade}}
";

/// Render the review summary for `draft`
pub fn render_review(post_type: PostType, draft: &Draft) -> Result<String> {
    let mut hb = Handlebars::new();

    // Don't escape HTML entities in the output
    hb.register_escape_fn(handlebars::no_escape);

    hb.register_template_string("review", REVIEW_TEMPLATE)
        .context("Failed to parse review template")?;

    let catalog = Catalog::builtin();
    let category_label = draft
        .category
        .as_deref()
        .map(|c| label_for(&catalog.categories(post_type), c))
        .unwrap_or_else(|| "-".to_string());
    let subcategory_label = match (&draft.category, &draft.subcategory) {
        (Some(c), Some(s)) => Some(label_for(&catalog.get_subcategories(c, post_type), s)),
        _ => None,
    };

    let location = match (&draft.subcity, &draft.city) {
        (Some(sub), Some(city)) => format!("{}, {}", sub, city),
        (None, Some(city)) => city.clone(),
        _ => "-".to_string(),
    };

    let context = json!({
        "title": draft.title.as_deref().unwrap_or("(untitled)"),
        "post_type": post_type.as_str(),
        "category": category_label,
        "subcategory": subcategory_label,
        "description": draft.description,
        "condition": draft.condition,
        "price": draft.price,
        "pricing_type": draft.pricing_type.map(|p| p.as_str()),
        "rate": draft.rate,
        "availability": draft.availability,
        "experience": draft.experience,
        "specifications": draft.specifications,
        "location": location,
        "image_count": draft.images.len(),
        "cover": draft.cover_image().map(|i| i.url.clone()),
        "trade": trade_summary(draft),
    });

    hb.render("review", &context)
        .context("Failed to render review summary")
}

fn label_for(options: &[crate::catalog::CatalogOption], value: &str) -> String {
    options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| value.to_string())
}

fn trade_summary(draft: &Draft) -> String {
    let prefs = &draft.trade_preferences;
    let mut parts = Vec::new();
    if prefs.open_to_offers {
        parts.push("open to offers".to_string());
    }
    if prefs.accept_cash {
        match prefs.cash_value {
            Some(v) => parts.push(format!("accepts cash ({})", v)),
            None => parts.push("accepts cash".to_string()),
        }
    }
    if !prefs.preferred_categories.is_empty() {
        parts.push(format!("wants {}", prefs.preferred_categories.join(", ")));
    }
    if let Some(items) = &prefs.specific_items {
        parts.push(format!("looking for {}", items));
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join("; ")
    }
}
