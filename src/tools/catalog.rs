//! Catalog MCP Tools
//!
//! Read-only lookups into the ingredient catalog.

use serde::Serialize;

use crate::models::{Catalog, Category, IngredientDefinition};

/// A catalog entry as returned by the tools
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub category_display: &'static str,
    pub default_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sap_naoh: Option<f64>,
}

impl From<&IngredientDefinition> for CatalogEntry {
    fn from(definition: &IngredientDefinition) -> Self {
        Self {
            id: definition.id,
            name: definition.name,
            category: definition.category.as_str(),
            category_display: definition.category.display_name(),
            default_percent: definition.default_percent,
            sap_naoh: definition.sap_naoh,
        }
    }
}

/// Response for list_catalog
#[derive(Debug, Serialize)]
pub struct ListCatalogResponse {
    pub ingredients: Vec<CatalogEntry>,
    pub total: usize,
    pub categories: Vec<&'static str>,
}

/// List catalog entries, optionally restricted to one category
pub fn list_catalog(catalog: &Catalog, category: Option<&str>) -> Result<ListCatalogResponse, String> {
    let ingredients: Vec<CatalogEntry> = match category {
        Some(raw) => {
            let category = Category::from_str(raw).ok_or_else(|| {
                let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("Unknown category '{}'. Valid categories: {}", raw, valid.join(", "))
            })?;
            catalog.by_category(category).map(CatalogEntry::from).collect()
        }
        None => catalog.entries().iter().map(CatalogEntry::from).collect(),
    };

    Ok(ListCatalogResponse {
        total: ingredients.len(),
        ingredients,
        categories: Category::ALL.iter().map(|c| c.as_str()).collect(),
    })
}

/// Look up one catalog entry
pub fn get_catalog_ingredient(catalog: &Catalog, id: &str) -> Option<CatalogEntry> {
    catalog.get(id).map(CatalogEntry::from)
}
