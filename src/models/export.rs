//! Formulation export
//!
//! The JSON document handed to whoever downloads or copies a formulation.
//! Totals and NaOH figures are rounded for display; line values are not.

use serde::{Deserialize, Serialize};

use crate::formulation::{round_to, NaohEstimate};
use super::catalog::Catalog;
use super::{Formulation, SoapType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulationExport {
    pub soap_type: SoapType,
    pub batch_weight: f64,
    pub superfat: f64,
    /// Rounded to 3 decimals
    pub total_percent: f64,
    /// Rounded to 2 decimals
    pub total_grams: f64,
    #[serde(rename = "suggestedPH")]
    pub suggested_ph: String,
    pub ingredients: Vec<ExportIngredient>,
    /// `null` for melt-and-pour
    pub naoh: Option<NaohExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportIngredient {
    pub id: String,
    pub name: String,
    pub percent: f64,
    pub grams: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaohExport {
    pub naoh_grams: f64,
    pub water_grams: f64,
    pub total_oils_grams: f64,
    pub total_naoh_unadjusted: f64,
}

impl From<NaohEstimate> for NaohExport {
    fn from(estimate: NaohEstimate) -> Self {
        Self {
            naoh_grams: round_to(estimate.adjusted_naoh, 3),
            water_grams: round_to(estimate.lye_water_grams, 2),
            total_oils_grams: round_to(estimate.total_oil_grams, 2),
            total_naoh_unadjusted: round_to(estimate.unadjusted_naoh, 3),
        }
    }
}

impl Formulation {
    /// Build the export document
    pub fn export(&self, catalog: &Catalog) -> FormulationExport {
        FormulationExport {
            soap_type: self.soap_type(),
            batch_weight: self.batch_weight(),
            superfat: self.superfat(),
            total_percent: round_to(self.total_percent(), 3),
            total_grams: round_to(self.total_grams(), 2),
            suggested_ph: self.soap_type().suggested_ph().to_string(),
            ingredients: self
                .lines()
                .iter()
                .map(|line| ExportIngredient {
                    id: line.id.clone(),
                    name: catalog.name_of(&line.id).to_string(),
                    percent: line.percent,
                    grams: line.grams,
                })
                .collect(),
            naoh: self.naoh(catalog).map(NaohExport::from),
        }
    }
}

impl FormulationExport {
    /// Pretty-printed JSON with two-space indentation
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_melt_and_pour_export_has_null_naoh() {
        let catalog = Catalog::builtin();
        let export = Formulation::default().export(&catalog);
        let json: Value = serde_json::from_str(&export.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["soapType"], "glicerina");
        assert_eq!(json["batchWeight"], 800.0);
        assert_eq!(json["superfat"], 5.0);
        assert_eq!(json["totalPercent"], 89.5);
        assert_eq!(json["totalGrams"], 716.0);
        assert_eq!(json["suggestedPH"], "7.0 - 8.5 (ideal 7.0 - 7.5 para bebés)");
        assert!(json["naoh"].is_null());

        let ingredients = json["ingredients"].as_array().unwrap();
        assert_eq!(ingredients.len(), 4);
        assert_eq!(ingredients[0]["id"], "glycerinBase");
        assert_eq!(ingredients[0]["name"], "Base de glicerina (vegetal)");
        assert_eq!(ingredients[0]["percent"], 85.0);
    }

    #[test]
    fn test_cold_process_export_rounds_naoh() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Saponificado, 800.0, 5.0);
        f.add_ingredient(&catalog, "coconutOil").unwrap();

        let export = f.export(&catalog);
        let naoh = export.naoh.clone().unwrap();
        assert_eq!(naoh.naoh_grams, 17.328);
        assert_eq!(naoh.water_grams, 36.48);
        assert_eq!(naoh.total_oils_grams, 96.0);
        assert_eq!(naoh.total_naoh_unadjusted, 18.24);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["soapType"], "saponificado");
        assert_eq!(json["suggestedPH"], "9.0 - 10.5 (normal en saponificado)");
        assert_eq!(json["naoh"]["naohGrams"], 17.328);
        assert_eq!(json["naoh"]["totalOilsGrams"], 96.0);
    }

    #[test]
    fn test_export_name_falls_back_to_id() {
        let catalog = Catalog::builtin();
        let f = Formulation::from_parts(
            SoapType::Glicerina,
            500.0,
            5.0,
            vec![crate::formulation::FormulationLine::from_percent("oatMilk", 3.0, 500.0)],
        );
        let export = f.export(&catalog);
        assert_eq!(export.ingredients[0].name, "oatMilk");
        assert!((export.ingredients[0].grams - 15.0).abs() < 1e-9);
    }
}
