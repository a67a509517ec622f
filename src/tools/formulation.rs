//! Formulation MCP Tools
//!
//! Tools that read and edit the current formulation. Each edit returns the
//! full recomputed view so the caller never works from stale totals.

use serde::Serialize;

use crate::formulation::{FormulationLine, NaohEstimate, NumericInput, LYE_WATER_PERCENT_OF_OILS};
use crate::models::{
    Catalog, Formulation, FormulationError, FormulationExport, FormulationLineDetail,
    FormulationSummary, SoapType, GLYCERIN_BASE_ID,
};

/// The current formulation with every derived value
#[derive(Debug, Serialize)]
pub struct FormulationView {
    #[serde(flatten)]
    pub summary: FormulationSummary,
    pub ingredients: Vec<FormulationLineDetail>,
}

impl FormulationView {
    pub fn of(formulation: &Formulation, catalog: &Catalog) -> Self {
        Self {
            summary: formulation.summary(catalog),
            ingredients: formulation.line_details(catalog),
        }
    }
}

/// Response for an ingredient edit
#[derive(Debug, Serialize)]
pub struct LineEditResponse {
    pub line: FormulationLine,
    pub formulation: FormulationView,
}

/// Response for remove_ingredient
#[derive(Debug, Serialize)]
pub struct RemoveIngredientResponse {
    pub removed: FormulationLine,
    pub formulation: FormulationView,
}

/// Response for clear_formulation
#[derive(Debug, Serialize)]
pub struct ClearFormulationResponse {
    pub removed_count: usize,
    pub formulation: FormulationView,
}

/// Informational response when an adjustment is refused
#[derive(Debug, Serialize)]
pub struct AdjustmentRefusedResponse {
    pub error: String,
    pub total_percent: f64,
}

/// A vegetable oil line in the NaOH breakdown
#[derive(Debug, Serialize)]
pub struct OilDetail {
    pub id: String,
    pub name: String,
    pub percent: f64,
    pub grams: f64,
    pub sap_naoh: Option<f64>,
}

/// Response for estimate_naoh
#[derive(Debug, Serialize)]
pub struct NaohResponse {
    pub soap_type: SoapType,
    pub batch_weight: f64,
    pub superfat: f64,
    pub lye_water_percent_of_oils: f64,
    pub oils: Vec<OilDetail>,
    /// `None` for melt-and-pour
    pub naoh: Option<NaohEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn edit_error(e: FormulationError) -> String {
    e.to_string()
}

// ============================================================================
// Read
// ============================================================================

pub fn get_formulation(formulation: &Formulation, catalog: &Catalog) -> FormulationView {
    FormulationView::of(formulation, catalog)
}

/// Replace the current formulation with the starter formula
pub fn reset_formulation(formulation: &mut Formulation, catalog: &Catalog) -> FormulationView {
    *formulation = Formulation::default();
    tracing::info!("Formulation reset to starter formula");
    FormulationView::of(formulation, catalog)
}

// ============================================================================
// Batch parameters
// ============================================================================

pub fn set_soap_type(
    formulation: &mut Formulation,
    catalog: &Catalog,
    soap_type: &str,
) -> Result<FormulationView, String> {
    let soap_type = SoapType::from_str(soap_type).ok_or_else(|| {
        format!(
            "Unknown soap type '{}'. Use '{}' or '{}'",
            soap_type,
            SoapType::Glicerina.as_str(),
            SoapType::Saponificado.as_str()
        )
    })?;
    formulation.set_soap_type(soap_type);
    tracing::debug!(soap_type = soap_type.as_str(), "Soap type changed");
    Ok(FormulationView::of(formulation, catalog))
}

pub fn set_batch_weight(
    formulation: &mut Formulation,
    catalog: &Catalog,
    raw: &NumericInput,
) -> FormulationView {
    let batch_weight = formulation.set_batch_weight(raw);
    tracing::debug!(batch_weight, "Batch weight changed");
    FormulationView::of(formulation, catalog)
}

pub fn set_superfat(
    formulation: &mut Formulation,
    catalog: &Catalog,
    raw: &NumericInput,
) -> FormulationView {
    let superfat = formulation.set_superfat(raw);
    tracing::debug!(superfat, "Superfat changed");
    FormulationView::of(formulation, catalog)
}

// ============================================================================
// Ingredient lines
// ============================================================================

pub fn add_ingredient(
    formulation: &mut Formulation,
    catalog: &Catalog,
    id: &str,
) -> Result<LineEditResponse, String> {
    let line = formulation.add_ingredient(catalog, id).map_err(edit_error)?.clone();
    Ok(LineEditResponse {
        line,
        formulation: FormulationView::of(formulation, catalog),
    })
}

pub fn update_ingredient_percent(
    formulation: &mut Formulation,
    catalog: &Catalog,
    id: &str,
    raw: &NumericInput,
) -> Result<LineEditResponse, String> {
    let line = formulation.set_percent(id, raw).map_err(edit_error)?.clone();
    Ok(LineEditResponse {
        line,
        formulation: FormulationView::of(formulation, catalog),
    })
}

pub fn update_ingredient_grams(
    formulation: &mut Formulation,
    catalog: &Catalog,
    id: &str,
    raw: &NumericInput,
) -> Result<LineEditResponse, String> {
    let line = formulation.set_grams(id, raw).map_err(edit_error)?.clone();
    Ok(LineEditResponse {
        line,
        formulation: FormulationView::of(formulation, catalog),
    })
}

pub fn remove_ingredient(
    formulation: &mut Formulation,
    catalog: &Catalog,
    id: &str,
) -> Result<RemoveIngredientResponse, String> {
    let removed = formulation.remove_ingredient(id).map_err(edit_error)?;
    tracing::debug!(id, "Removed ingredient");
    Ok(RemoveIngredientResponse {
        removed,
        formulation: FormulationView::of(formulation, catalog),
    })
}

pub fn clear_formulation(formulation: &mut Formulation, catalog: &Catalog) -> ClearFormulationResponse {
    let removed_count = formulation.clear();
    tracing::debug!(removed_count, "Cleared formulation");
    ClearFormulationResponse {
        removed_count,
        formulation: FormulationView::of(formulation, catalog),
    }
}

// ============================================================================
// Adjustments
// ============================================================================

/// Scale every line so the percents total 100
pub fn rebalance_to_hundred(
    formulation: &mut Formulation,
    catalog: &Catalog,
) -> Result<FormulationView, AdjustmentRefusedResponse> {
    match formulation.rebalance_to_hundred() {
        Ok(()) => Ok(FormulationView::of(formulation, catalog)),
        Err(e) => Err(AdjustmentRefusedResponse {
            error: e.to_string(),
            total_percent: formulation.total_percent(),
        }),
    }
}

/// Set the glycerin base to whatever the other lines leave free
///
/// Refused for cold process, where oils must be adjusted by hand.
pub fn fill_base_to_hundred(
    formulation: &mut Formulation,
    catalog: &Catalog,
) -> Result<FormulationView, AdjustmentRefusedResponse> {
    match formulation.fill_base_to_hundred() {
        Ok(base) => {
            tracing::debug!(id = GLYCERIN_BASE_ID, percent = base.percent, "Filled base");
            Ok(FormulationView::of(formulation, catalog))
        }
        Err(e) => Err(AdjustmentRefusedResponse {
            error: e.to_string(),
            total_percent: formulation.total_percent(),
        }),
    }
}

// ============================================================================
// Derived
// ============================================================================

pub fn estimate_naoh(formulation: &Formulation, catalog: &Catalog) -> NaohResponse {
    let oils = formulation
        .lines()
        .iter()
        .filter_map(|line| {
            let definition = catalog.get(&line.id)?;
            definition.is_vegetable_oil().then(|| OilDetail {
                id: line.id.clone(),
                name: definition.name.to_string(),
                percent: line.percent,
                grams: line.grams,
                sap_naoh: definition.sap_naoh,
            })
        })
        .collect();

    let message = if formulation.soap_type().requires_lye() {
        None
    } else {
        Some("Melt-and-pour base is already saponified; no NaOH is needed".to_string())
    };

    NaohResponse {
        soap_type: formulation.soap_type(),
        batch_weight: formulation.batch_weight(),
        superfat: formulation.superfat(),
        lye_water_percent_of_oils: LYE_WATER_PERCENT_OF_OILS,
        oils,
        naoh: formulation.naoh(catalog),
        message,
    }
}

pub fn export_formulation(formulation: &Formulation, catalog: &Catalog) -> FormulationExport {
    formulation.export(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_flattens_summary() {
        let catalog = Catalog::builtin();
        let view = get_formulation(&Formulation::default(), &catalog);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["soap_type"], "glicerina");
        assert_eq!(json["batch_weight"], 800.0);
        assert!(json["naoh"].is_null());
        assert_eq!(json["ingredients"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_reset_restores_starter() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Saponificado, 100.0, 0.0);
        let view = reset_formulation(&mut f, &catalog);
        assert_eq!(f, Formulation::default());
        assert_eq!(view.ingredients.len(), 4);
    }

    #[test]
    fn test_set_soap_type_rejects_unknown() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        assert!(set_soap_type(&mut f, &catalog, "hot-process").is_err());
        assert_eq!(f.soap_type(), SoapType::Glicerina);

        let view = set_soap_type(&mut f, &catalog, "saponificado").unwrap();
        assert_eq!(view.summary.soap_type, SoapType::Saponificado);
        assert!(view.summary.naoh.is_some());
    }

    #[test]
    fn test_batch_weight_text_input() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        let view = set_batch_weight(&mut f, &catalog, &" 1000 ".into());
        assert_eq!(view.summary.batch_weight, 1000.0);

        let view = set_batch_weight(&mut f, &catalog, &"0.2".into());
        assert_eq!(view.summary.batch_weight, 1.0);
    }

    #[test]
    fn test_add_duplicate_is_error() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        let err = add_ingredient(&mut f, &catalog, "decyl").unwrap_err();
        assert!(err.contains("decyl"));
        assert_eq!(f.lines().len(), 4);
    }

    #[test]
    fn test_update_grams_returns_line() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        let response = update_ingredient_grams(&mut f, &catalog, "charcoal", &40.0.into()).unwrap();
        assert!((response.line.percent - 5.0).abs() < 1e-9);
        assert!((response.formulation.summary.total_percent - 92.5).abs() < 1e-9);
    }

    #[test]
    fn test_remove_and_clear() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        let response = remove_ingredient(&mut f, &catalog, "mentaEO").unwrap();
        assert_eq!(response.removed.id, "mentaEO");
        assert!(remove_ingredient(&mut f, &catalog, "mentaEO").is_err());

        let cleared = clear_formulation(&mut f, &catalog);
        assert_eq!(cleared.removed_count, 3);
        assert!(cleared.formulation.ingredients.is_empty());
    }

    #[test]
    fn test_fill_base_refused_for_cold_process() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        f.set_soap_type(SoapType::Saponificado);

        let refused = fill_base_to_hundred(&mut f, &catalog).unwrap_err();
        assert!(refused.error.contains("manually"));
        assert!((refused.total_percent - 89.5).abs() < 1e-9);
        assert!((f.line(GLYCERIN_BASE_ID).unwrap().percent - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_base_melt_and_pour() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        let view = fill_base_to_hundred(&mut f, &catalog).unwrap();
        assert!((view.summary.total_percent - 100.0).abs() < 1e-9);
        assert!((f.line(GLYCERIN_BASE_ID).unwrap().percent - 95.5).abs() < 1e-9);
    }

    #[test]
    fn test_rebalance_empty_is_informational() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Glicerina, 800.0, 5.0);
        let refused = rebalance_to_hundred(&mut f, &catalog).unwrap_err();
        assert_eq!(refused.total_percent, 0.0);
    }

    #[test]
    fn test_naoh_breakdown() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Saponificado, 800.0, 5.0);
        f.add_ingredient(&catalog, "coconutOil").unwrap();
        f.add_ingredient(&catalog, "roseHydrosol").unwrap();

        let response = estimate_naoh(&f, &catalog);
        assert_eq!(response.oils.len(), 1);
        assert_eq!(response.oils[0].id, "coconutOil");
        assert!(response.message.is_none());
        assert!((response.naoh.unwrap().adjusted_naoh - 17.328).abs() < 1e-9);

        let response = estimate_naoh(&Formulation::default(), &catalog);
        assert!(response.naoh.is_none());
        assert!(response.message.is_some());
    }
}
