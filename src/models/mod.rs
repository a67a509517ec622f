//! Data models
//!
//! The ingredient catalog, the formulation being edited, and saved batch
//! records.

pub mod catalog;
mod export;
mod formulation;
mod saved_formulation;
mod soap_type;

pub use catalog::{
    Catalog, Category, IngredientDefinition, BUILTIN_INGREDIENTS, CUSTOM_CATEGORY, GLYCERIN_BASE_ID,
};
pub use export::{ExportIngredient, FormulationExport, NaohExport};
pub use formulation::{
    Formulation, FormulationError, FormulationLineDetail, FormulationSummary, DEFAULT_BATCH_GRAMS,
    DEFAULT_SUPERFAT_PERCENT,
};
pub use saved_formulation::{
    SavedFormulation, SavedFormulationCreate, SavedFormulationFilter, SavedFormulationUpdate,
    BATCH_DATE_FORMAT,
};
pub use soap_type::SoapType;
