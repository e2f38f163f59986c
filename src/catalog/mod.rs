//! Embedded category/specification catalog.
//!
//! Static lookup tables mapping category → subcategory → specification
//! fields → allowed values. Dependent fields (a `Model` whose options depend
//! on the chosen `Brand` or `Make`) carry a per-parent option table.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

use crate::draft::PostType;

const CATALOG_JSON: &str = include_str!("catalog.json");

/// Catalog parsed once from the embedded JSON
static BUILTIN: Lazy<Catalog> = Lazy::new(|| match Catalog::from_json(CATALOG_JSON) {
    Ok(catalog) => catalog,
    Err(e) => {
        tracing::error!(error = %e, "Embedded catalog failed to parse");
        Catalog::default()
    }
});

/// A selectable value and its display label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub conditions: Vec<String>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub value: String,
    pub label: String,
    pub post_types: Vec<PostType>,
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub value: String,
    pub label: String,
    /// Restricts the subcategory to some post types; empty inherits the category's
    #[serde(default)]
    pub post_types: Vec<PostType>,
    #[serde(default)]
    pub specifications: Vec<SpecField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecField {
    pub name: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Parent field whose chosen value selects the option list
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub options_by: BTreeMap<String, Vec<String>>,
}

impl Subcategory {
    fn offered_for(&self, category: &Category, post_type: PostType) -> bool {
        if self.post_types.is_empty() {
            category.post_types.contains(&post_type)
        } else {
            self.post_types.contains(&post_type)
        }
    }

    fn field(&self, name: &str) -> Option<&SpecField> {
        self.specifications
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The catalog shipped with the binary
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    fn category(&self, value: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.value == value)
    }

    fn subcategory(&self, category: &str, subcategory: &str) -> Option<&Subcategory> {
        self.category(category)?
            .subcategories
            .iter()
            .find(|s| s.value == subcategory)
    }

    /// Categories offering at least one subcategory for `post_type`
    pub fn categories(&self, post_type: PostType) -> Vec<CatalogOption> {
        self.categories
            .iter()
            .filter(|c| c.subcategories.iter().any(|s| s.offered_for(c, post_type)))
            .map(|c| CatalogOption {
                value: c.value.clone(),
                label: c.label.clone(),
            })
            .collect()
    }

    pub fn has_category(&self, post_type: PostType, category: &str) -> bool {
        self.category(category)
            .is_some_and(|c| c.subcategories.iter().any(|s| s.offered_for(c, post_type)))
    }

    /// Subcategories of `category` offered for `post_type`, in catalog order.
    /// Unknown categories yield an empty list.
    pub fn get_subcategories(&self, category: &str, post_type: PostType) -> Vec<CatalogOption> {
        let Some(cat) = self.category(category) else {
            return Vec::new();
        };
        cat.subcategories
            .iter()
            .filter(|s| s.offered_for(cat, post_type))
            .map(|s| CatalogOption {
                value: s.value.clone(),
                label: s.label.clone(),
            })
            .collect()
    }

    pub fn has_subcategory(&self, post_type: PostType, category: &str, subcategory: &str) -> bool {
        self.get_subcategories(category, post_type)
            .iter()
            .any(|s| s.value == subcategory)
    }

    /// Specification field names for a category/subcategory pairing
    pub fn get_specifications(&self, category: &str, subcategory: &str) -> Vec<String> {
        self.subcategory(category, subcategory)
            .map(|s| s.specifications.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Full field definitions for a category/subcategory pairing
    pub fn specification_fields(&self, category: &str, subcategory: &str) -> &[SpecField] {
        self.subcategory(category, subcategory)
            .map(|s| s.specifications.as_slice())
            .unwrap_or_default()
    }

    /// Allowed values of `field`. For a dependent field the list is selected
    /// by the parent's value in `dependent_values`; a missing or unknown
    /// parent value yields an empty list.
    pub fn get_specification_options(
        &self,
        category: &str,
        subcategory: &str,
        field: &str,
        dependent_values: &HashMap<String, String>,
    ) -> Vec<String> {
        let Some(spec) = self
            .subcategory(category, subcategory)
            .and_then(|s| s.field(field))
        else {
            return Vec::new();
        };

        let Some(parent) = &spec.depends_on else {
            return spec.options.clone();
        };

        let parent_value = dependent_values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(parent))
            .map(|(_, v)| v.as_str());

        parent_value
            .and_then(|value| {
                spec.options_by
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(value))
            })
            .map(|(_, options)| options.clone())
            .unwrap_or_default()
    }

    /// Fields whose options depend on `field` (e.g. `Model` for `Brand`)
    pub fn dependent_fields(&self, category: &str, subcategory: &str, field: &str) -> Vec<String> {
        self.subcategory(category, subcategory)
            .map(|s| {
                s.specifications
                    .iter()
                    .filter(|f| {
                        f.depends_on
                            .as_deref()
                            .is_some_and(|p| p.eq_ignore_ascii_case(field))
                    })
                    .map(|f| f.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Item condition values
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }
}

/// Subcategories of `category` in the builtin catalog
pub fn get_subcategories(category: &str, post_type: PostType) -> Vec<CatalogOption> {
    Catalog::builtin().get_subcategories(category, post_type)
}

/// Specification fields in the builtin catalog
pub fn get_specifications(category: &str, subcategory: &str) -> Vec<String> {
    Catalog::builtin().get_specifications(category, subcategory)
}

/// Specification options in the builtin catalog
pub fn get_specification_options(
    category: &str,
    subcategory: &str,
    field: &str,
    dependent_values: &HashMap<String, String>,
) -> Vec<String> {
    Catalog::builtin().get_specification_options(category, subcategory, field, dependent_values)
}
