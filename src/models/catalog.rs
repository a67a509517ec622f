//! Ingredient catalog
//!
//! The fixed, read-only table of ingredients a formulation can draw from.
//! Built once at startup and shared by reference.

use std::collections::HashMap;

use serde::Serialize;

/// Catalog id of the melt-and-pour base
pub const GLYCERIN_BASE_ID: &str = "glycerinBase";

/// Ingredient category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    Polvos,
    Arcillas,
    Bases,
    Surfactantes,
    AceitesVegetales,
    Hidrolatos,
    Ceras,
    AceitesEsenciales,
    Aromas,
    Conservantes,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Polvos,
        Category::Arcillas,
        Category::Bases,
        Category::Surfactantes,
        Category::AceitesVegetales,
        Category::Hidrolatos,
        Category::Ceras,
        Category::AceitesEsenciales,
        Category::Aromas,
        Category::Conservantes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Polvos => "Polvos",
            Category::Arcillas => "Arcillas",
            Category::Bases => "Bases",
            Category::Surfactantes => "Surfactantes",
            Category::AceitesVegetales => "AceitesVegetales",
            Category::Hidrolatos => "Hidrolatos",
            Category::Ceras => "Ceras",
            Category::AceitesEsenciales => "AceitesEsenciales",
            Category::Aromas => "Aromas",
            Category::Conservantes => "Conservantes",
        }
    }

    /// Parse a category tag, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == lower)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Polvos => "Powders & botanicals",
            Category::Arcillas => "Clays",
            Category::Bases => "Bases",
            Category::Surfactantes => "Surfactants",
            Category::AceitesVegetales => "Vegetable oils",
            Category::Hidrolatos => "Hydrosols",
            Category::Ceras => "Waxes & emollients",
            Category::AceitesEsenciales => "Essential oils",
            Category::Aromas => "Fragrances",
            Category::Conservantes => "Preservatives",
        }
    }
}

/// Category tag shown for lines whose id is not in the catalog
pub const CUSTOM_CATEGORY: &str = "Personalizado";

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub default_percent: f64,
    /// Grams of NaOH per gram; vegetable oils only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sap_naoh: Option<f64>,
}

impl IngredientDefinition {
    const fn new(id: &'static str, name: &'static str, category: Category, default_percent: f64) -> Self {
        Self { id, name, category, default_percent, sap_naoh: None }
    }

    const fn oil(id: &'static str, name: &'static str, default_percent: f64, sap_naoh: f64) -> Self {
        Self {
            id,
            name,
            category: Category::AceitesVegetales,
            default_percent,
            sap_naoh: Some(sap_naoh),
        }
    }

    pub fn is_vegetable_oil(&self) -> bool {
        self.category == Category::AceitesVegetales
    }
}

/// Built-in ingredients
pub const BUILTIN_INGREDIENTS: [IngredientDefinition; 21] = [
    IngredientDefinition::new("charcoal", "Carbón activado (polvo)", Category::Polvos, 2.0),
    IngredientDefinition::new("ricePowder", "Polvo de arroz", Category::Polvos, 3.0),
    IngredientDefinition::new("maracuyaSeeds", "Pepas maracuyá (molidas)", Category::Polvos, 5.0),
    IngredientDefinition::new("manzanilla", "Manzanilla (polvo/infusión)", Category::Polvos, 2.0),
    IngredientDefinition::new("greenClay", "Arcilla verde", Category::Arcillas, 4.0),
    IngredientDefinition::new("whiteClay", "Arcilla blanca", Category::Arcillas, 4.0),
    IngredientDefinition::new("yellowClay", "Arcilla amarilla", Category::Arcillas, 4.0),
    IngredientDefinition::new("pinkClay", "Arcilla rosada", Category::Arcillas, 4.0),
    IngredientDefinition::new(GLYCERIN_BASE_ID, "Base de glicerina (vegetal)", Category::Bases, 85.0),
    IngredientDefinition::new("decyl", "Decyl Glucoside", Category::Surfactantes, 2.0),
    IngredientDefinition::oil("coconutOil", "Aceite de coco", 12.0, 0.190),
    IngredientDefinition::oil("oliveOil", "Aceite de oliva", 30.0, 0.134),
    IngredientDefinition::oil("castorOil", "Aceite de ricino", 5.0, 0.128),
    IngredientDefinition::oil("sunflowerOil", "Aceite girasol", 20.0, 0.136),
    IngredientDefinition::oil("almondOil", "Aceite almendras", 10.0, 0.136),
    IngredientDefinition::new("roseHydrosol", "Hidrolato de rosas", Category::Hidrolatos, 5.0),
    IngredientDefinition::new("beeswax", "Cera de abejas", Category::Ceras, 2.0),
    IngredientDefinition::new("mentaEO", "Aceite esencial de menta", Category::AceitesEsenciales, 0.5),
    IngredientDefinition::new("lavenderEO", "Aceite esencial de lavanda", Category::AceitesEsenciales, 0.6),
    IngredientDefinition::new("aromaCoco", "Aroma natural (coco)", Category::Aromas, 1.5),
    IngredientDefinition::new("sharomix", "Conservante (Sharomix)", Category::Conservantes, 0.3),
];

/// Read-only ingredient lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<IngredientDefinition>,
    by_id: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Build a catalog from entries; a later duplicate id shadows an earlier one
    pub fn new(entries: Vec<IngredientDefinition>) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.id, idx))
            .collect();
        Self { entries, by_id }
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        Self::new(BUILTIN_INGREDIENTS.to_vec())
    }

    pub fn get(&self, id: &str) -> Option<&IngredientDefinition> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    /// All entries in catalog order
    pub fn entries(&self) -> &[IngredientDefinition] {
        &self.entries
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &IngredientDefinition> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Display name for an id, falling back to the id itself
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|e| e.name).unwrap_or(id)
    }

    /// Category tag for an id, or [`CUSTOM_CATEGORY`] when unknown
    pub fn category_of(&self, id: &str) -> &'static str {
        self.get(id)
            .map(|e| e.category.as_str())
            .unwrap_or(CUSTOM_CATEGORY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
