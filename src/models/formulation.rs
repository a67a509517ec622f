//! Formulation model
//!
//! The current formulation: batch parameters plus ingredient lines. Every
//! edit keeps `grams == percent / 100 * batch_weight` for each line, and
//! derived quantities (totals, NaOH) are recomputed on each read.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formulation::{
    coerce_batch_weight, coerce_number, estimate_naoh, fill_base_to_hundred, grams_to_percent,
    percent_to_grams, rebalance_to_hundred, total_grams, total_percent, FormulationLine,
    NaohEstimate, NumericInput, OilLine,
};
use super::catalog::{Catalog, GLYCERIN_BASE_ID};
use super::SoapType;

pub const DEFAULT_BATCH_GRAMS: f64 = 800.0;
pub const DEFAULT_SUPERFAT_PERCENT: f64 = 5.0;

/// Percent given to an added ingredient whose catalog default is 0
const FALLBACK_ADD_PERCENT: f64 = 1.0;

/// Relative gap between stored grams and `percent * batch` still read as equal
const STORED_GRAMS_TOLERANCE: f64 = 1e-9;

/// Formulation edit errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulationError {
    #[error("Unknown ingredient id: {0}")]
    UnknownIngredient(String),

    #[error("Ingredient already in formulation: {0}")]
    DuplicateIngredient(String),

    #[error("Ingredient not in formulation: {0}")]
    NotInFormulation(String),

    #[error(
        "Cold-process formulations are not auto-filled: adjust the vegetable oil percentages \
         manually (the NaOH estimate updates after every edit)"
    )]
    ManualAdjustmentRequired,

    #[error("Total percent is {0}; there is nothing to rebalance")]
    NonPositiveTotal(f64),
}

/// A formulation line with its catalog details
#[derive(Debug, Clone, Serialize)]
pub struct FormulationLineDetail {
    pub id: String,
    pub name: String,
    pub category: &'static str,
    pub percent: f64,
    pub grams: f64,
}

/// Derived quantities of a formulation
#[derive(Debug, Clone, Serialize)]
pub struct FormulationSummary {
    pub soap_type: SoapType,
    pub batch_weight: f64,
    pub superfat: f64,
    pub total_percent: f64,
    pub total_grams: f64,
    pub suggested_ph: &'static str,
    /// Present for cold process only
    pub naoh: Option<NaohEstimate>,
}

/// The formulation being edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formulation {
    soap_type: SoapType,
    batch_weight: f64,
    superfat: f64,
    lines: Vec<FormulationLine>,
}

impl Formulation {
    /// An empty formulation
    pub fn new(soap_type: SoapType, batch_weight: f64, superfat: f64) -> Self {
        Self {
            soap_type,
            batch_weight: coerce_batch_weight(&batch_weight.into()),
            superfat: coerce_number(&superfat.into()),
            lines: Vec::new(),
        }
    }

    /// Rebuild a formulation from stored parts
    ///
    /// Stored grams are kept when they agree with the percent; otherwise they
    /// are recomputed from it. A repeated id keeps only its first line.
    pub fn from_parts(
        soap_type: SoapType,
        batch_weight: f64,
        superfat: f64,
        lines: impl IntoIterator<Item = FormulationLine>,
    ) -> Self {
        let mut formulation = Self::new(soap_type, batch_weight, superfat);
        for line in lines {
            if formulation.position(&line.id).is_some() {
                continue;
            }
            let percent = coerce_number(&line.percent.into());
            let expected = percent_to_grams(percent, formulation.batch_weight);
            let grams = coerce_number(&line.grams.into());
            let grams = if (grams - expected).abs() <= STORED_GRAMS_TOLERANCE * expected.abs().max(1.0) {
                grams
            } else {
                tracing::debug!(id = %line.id, grams, expected, "Recomputing stored grams");
                expected
            };
            formulation.lines.push(FormulationLine { id: line.id, percent, grams });
        }
        formulation
    }

    pub fn soap_type(&self) -> SoapType {
        self.soap_type
    }

    pub fn batch_weight(&self) -> f64 {
        self.batch_weight
    }

    pub fn superfat(&self) -> f64 {
        self.superfat
    }

    pub fn lines(&self) -> &[FormulationLine] {
        &self.lines
    }

    pub fn line(&self, id: &str) -> Option<&FormulationLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.id == id)
    }

    fn position_or_err(&self, id: &str) -> Result<usize, FormulationError> {
        self.position(id)
            .ok_or_else(|| FormulationError::NotInFormulation(id.to_string()))
    }

    // ------------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------------

    /// Add a catalog ingredient at its default percent
    pub fn add_ingredient(
        &mut self,
        catalog: &Catalog,
        id: &str,
    ) -> Result<&FormulationLine, FormulationError> {
        let definition = catalog
            .get(id)
            .ok_or_else(|| FormulationError::UnknownIngredient(id.to_string()))?;

        if self.position(id).is_some() {
            return Err(FormulationError::DuplicateIngredient(id.to_string()));
        }

        let percent = if definition.default_percent != 0.0 {
            definition.default_percent
        } else {
            FALLBACK_ADD_PERCENT
        };

        tracing::debug!(id, percent, "Adding ingredient");
        self.lines
            .push(FormulationLine::from_percent(definition.id, percent, self.batch_weight));
        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Set a line's percent; grams follow from the batch weight
    pub fn set_percent(
        &mut self,
        id: &str,
        raw: &NumericInput,
    ) -> Result<&FormulationLine, FormulationError> {
        let idx = self.position_or_err(id)?;
        let percent = coerce_number(raw);
        let batch_weight = self.batch_weight;
        let line = &mut self.lines[idx];
        line.percent = percent;
        line.grams = percent_to_grams(percent, batch_weight);
        Ok(&self.lines[idx])
    }

    /// Set a line's grams; percent follows from the batch weight
    pub fn set_grams(
        &mut self,
        id: &str,
        raw: &NumericInput,
    ) -> Result<&FormulationLine, FormulationError> {
        let idx = self.position_or_err(id)?;
        let grams = coerce_number(raw);
        let batch_weight = self.batch_weight;
        let line = &mut self.lines[idx];
        line.grams = grams;
        line.percent = grams_to_percent(grams, batch_weight);
        Ok(&self.lines[idx])
    }

    pub fn remove_ingredient(&mut self, id: &str) -> Result<FormulationLine, FormulationError> {
        let idx = self.position_or_err(id)?;
        Ok(self.lines.remove(idx))
    }

    /// Remove every line, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.lines.len();
        self.lines.clear();
        removed
    }

    /// Change the batch weight; percents stay, grams rescale
    pub fn set_batch_weight(&mut self, raw: &NumericInput) -> f64 {
        let batch_weight = coerce_batch_weight(raw);
        self.batch_weight = batch_weight;
        for line in &mut self.lines {
            line.grams = percent_to_grams(line.percent, batch_weight);
        }
        batch_weight
    }

    pub fn set_soap_type(&mut self, soap_type: SoapType) {
        self.soap_type = soap_type;
    }

    pub fn set_superfat(&mut self, raw: &NumericInput) -> f64 {
        self.superfat = coerce_number(raw);
        self.superfat
    }

    /// Scale all percents to total 100
    pub fn rebalance_to_hundred(&mut self) -> Result<(), FormulationError> {
        let total = total_percent(&self.lines);
        if total <= 0.0 {
            return Err(FormulationError::NonPositiveTotal(total));
        }
        self.lines = rebalance_to_hundred(&self.lines, self.batch_weight);
        Ok(())
    }

    /// Give the glycerin base the share the other lines leave free
    ///
    /// Melt-and-pour only; oils in a cold-process batch react with lye and
    /// are never rescaled silently.
    pub fn fill_base_to_hundred(&mut self) -> Result<&FormulationLine, FormulationError> {
        if self.soap_type.requires_lye() {
            return Err(FormulationError::ManualAdjustmentRequired);
        }
        self.lines = fill_base_to_hundred(&self.lines, GLYCERIN_BASE_ID, self.batch_weight);
        let idx = self.position_or_err(GLYCERIN_BASE_ID)?;
        Ok(&self.lines[idx])
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    pub fn total_percent(&self) -> f64 {
        total_percent(&self.lines)
    }

    pub fn total_grams(&self) -> f64 {
        total_grams(&self.lines)
    }

    /// Lines that are vegetable oils in the catalog
    pub fn oil_lines(&self, catalog: &Catalog) -> Vec<OilLine> {
        self.lines
            .iter()
            .filter_map(|line| {
                let definition = catalog.get(&line.id)?;
                definition.is_vegetable_oil().then_some(OilLine {
                    percent: line.percent,
                    sap_naoh: definition.sap_naoh,
                })
            })
            .collect()
    }

    /// NaOH estimate for cold process; `None` for melt-and-pour
    pub fn naoh(&self, catalog: &Catalog) -> Option<NaohEstimate> {
        if !self.soap_type.requires_lye() {
            return None;
        }
        Some(estimate_naoh(&self.oil_lines(catalog), self.batch_weight, self.superfat))
    }

    pub fn summary(&self, catalog: &Catalog) -> FormulationSummary {
        FormulationSummary {
            soap_type: self.soap_type,
            batch_weight: self.batch_weight,
            superfat: self.superfat,
            total_percent: self.total_percent(),
            total_grams: self.total_grams(),
            suggested_ph: self.soap_type.suggested_ph(),
            naoh: self.naoh(catalog),
        }
    }

    pub fn line_details(&self, catalog: &Catalog) -> Vec<FormulationLineDetail> {
        self.lines
            .iter()
            .map(|line| FormulationLineDetail {
                id: line.id.clone(),
                name: catalog.name_of(&line.id).to_string(),
                category: catalog.category_of(&line.id),
                percent: line.percent,
                grams: line.grams,
            })
            .collect()
    }
}

impl Default for Formulation {
    /// Starter melt-and-pour formula
    fn default() -> Self {
        Self::from_parts(
            SoapType::Glicerina,
            DEFAULT_BATCH_GRAMS,
            DEFAULT_SUPERFAT_PERCENT,
            [
                (GLYCERIN_BASE_ID, 85.0),
                ("decyl", 2.0),
                ("charcoal", 2.0),
                ("mentaEO", 0.5),
            ]
            .into_iter()
            .map(|(id, percent)| FormulationLine::from_percent(id, percent, DEFAULT_BATCH_GRAMS)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn cold_process() -> Formulation {
        Formulation::new(SoapType::Saponificado, 800.0, 5.0)
    }

    fn assert_grams_invariant(f: &Formulation) {
        for line in f.lines() {
            let expected = percent_to_grams(line.percent, f.batch_weight());
            assert!((line.grams - expected).abs() < 1e-9, "{}", line.id);
        }
    }

    #[test]
    fn test_default_formulation() {
        let f = Formulation::default();
        assert_eq!(f.soap_type(), SoapType::Glicerina);
        assert_eq!(f.batch_weight(), 800.0);
        assert_eq!(f.lines().len(), 4);
        assert!((f.total_percent() - 89.5).abs() < EPS);
        assert!((f.line(GLYCERIN_BASE_ID).unwrap().grams - 680.0).abs() < EPS);
        assert_grams_invariant(&f);
    }

    #[test]
    fn test_add_uses_catalog_default() {
        let catalog = Catalog::builtin();
        let mut f = cold_process();
        let line = f.add_ingredient(&catalog, "coconutOil").unwrap();
        assert_eq!(line.percent, 12.0);
        assert!((line.grams - 96.0).abs() < EPS);
    }

    #[test]
    fn test_add_rejects_duplicates_and_unknown() {
        let catalog = Catalog::builtin();
        let mut f = cold_process();
        f.add_ingredient(&catalog, "oliveOil").unwrap();

        assert_eq!(
            f.add_ingredient(&catalog, "oliveOil").unwrap_err(),
            FormulationError::DuplicateIngredient("oliveOil".to_string())
        );
        assert_eq!(
            f.add_ingredient(&catalog, "lard").unwrap_err(),
            FormulationError::UnknownIngredient("lard".to_string())
        );
        assert_eq!(f.lines().len(), 1);
    }

    #[test]
    fn test_add_zero_default_falls_back_to_one_percent() {
        let mut entries = crate::models::catalog::BUILTIN_INGREDIENTS.to_vec();
        entries[0].default_percent = 0.0;
        let catalog = Catalog::new(entries);

        let mut f = cold_process();
        let line = f.add_ingredient(&catalog, "charcoal").unwrap();
        assert_eq!(line.percent, FALLBACK_ADD_PERCENT);
    }

    #[test]
    fn test_set_grams_updates_percent() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Glicerina, 800.0, 5.0);
        f.add_ingredient(&catalog, "decyl").unwrap();

        let line = f.set_grams("decyl", &50.0.into()).unwrap();
        assert!((line.percent - 6.25).abs() < EPS);
        assert_eq!(line.grams, 50.0);
    }

    #[test]
    fn test_set_percent_coerces_text() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Glicerina, 800.0, 5.0);
        f.add_ingredient(&catalog, "decyl").unwrap();

        let line = f.set_percent("decyl", &"3".into()).unwrap();
        assert!((line.grams - 24.0).abs() < EPS);

        let line = f.set_percent("decyl", &"three".into()).unwrap();
        assert_eq!(line.percent, 0.0);
        assert_eq!(line.grams, 0.0);
    }

    #[test]
    fn test_edit_missing_line_is_error() {
        let mut f = Formulation::new(SoapType::Glicerina, 800.0, 5.0);
        assert!(matches!(
            f.set_percent("decyl", &1.0.into()),
            Err(FormulationError::NotInFormulation(_))
        ));
        assert!(f.remove_ingredient("decyl").is_err());
    }

    #[test]
    fn test_batch_weight_change_rescales_grams_only() {
        let mut f = Formulation::default();
        let before: Vec<f64> = f.lines().iter().map(|l| l.percent).collect();

        assert_eq!(f.set_batch_weight(&1000.0.into()), 1000.0);

        let after: Vec<f64> = f.lines().iter().map(|l| l.percent).collect();
        assert_eq!(before, after);
        assert!((f.line(GLYCERIN_BASE_ID).unwrap().grams - 850.0).abs() < EPS);
        assert!((f.line("mentaEO").unwrap().grams - 5.0).abs() < EPS);
        assert_grams_invariant(&f);
    }

    #[test]
    fn test_batch_weight_clamped() {
        let mut f = Formulation::default();
        assert_eq!(f.set_batch_weight(&"".into()), 1.0);
        assert_eq!(f.set_batch_weight(&(-20.0).into()), 1.0);
        assert_grams_invariant(&f);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut f = Formulation::default();
        let removed = f.remove_ingredient("charcoal").unwrap();
        assert_eq!(removed.id, "charcoal");
        assert_eq!(f.lines().len(), 3);
        assert_eq!(f.clear(), 3);
        assert!(f.lines().is_empty());
    }

    #[test]
    fn test_rebalance() {
        let mut f = Formulation::default();
        f.rebalance_to_hundred().unwrap();
        assert!((f.total_percent() - 100.0).abs() < 1e-9);
        assert!((f.total_grams() - 800.0).abs() < 1e-9);
        assert_grams_invariant(&f);
    }

    #[test]
    fn test_rebalance_empty_is_refused() {
        let mut f = cold_process();
        assert_eq!(f.rebalance_to_hundred(), Err(FormulationError::NonPositiveTotal(0.0)));
    }

    #[test]
    fn test_fill_base_melt_and_pour() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Glicerina, 800.0, 5.0);
        f.add_ingredient(&catalog, "decyl").unwrap();
        f.set_percent("decyl", &10.0.into()).unwrap();
        f.add_ingredient(&catalog, "charcoal").unwrap();
        f.set_percent("charcoal", &5.0.into()).unwrap();

        let base = f.fill_base_to_hundred().unwrap();
        assert!((base.percent - 85.0).abs() < EPS);
        assert!((base.grams - 680.0).abs() < EPS);
        assert!((f.total_percent() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_fill_base_refused_for_cold_process() {
        let mut f = cold_process();
        assert_eq!(
            f.fill_base_to_hundred().unwrap_err(),
            FormulationError::ManualAdjustmentRequired
        );
        assert!(f.lines().is_empty());
    }

    #[test]
    fn test_naoh_only_for_cold_process() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::default();
        f.add_ingredient(&catalog, "coconutOil").unwrap();
        assert!(f.naoh(&catalog).is_none());

        f.set_soap_type(SoapType::Saponificado);
        let naoh = f.naoh(&catalog).unwrap();
        // Only the coconut oil is an oil; base, surfactant, powder and EO are not
        assert!((naoh.total_oil_grams - 96.0).abs() < EPS);
        assert!((naoh.unadjusted_naoh - 18.24).abs() < EPS);
        assert!((naoh.adjusted_naoh - 17.328).abs() < EPS);
        assert!((naoh.lye_water_grams - 36.48).abs() < EPS);
    }

    #[test]
    fn test_superfat_lowers_lye() {
        let catalog = Catalog::builtin();
        let mut f = cold_process();
        f.add_ingredient(&catalog, "oliveOil").unwrap();

        f.set_superfat(&0.0.into());
        let full = f.naoh(&catalog).unwrap().adjusted_naoh;
        f.set_superfat(&"8".into());
        let discounted = f.naoh(&catalog).unwrap().adjusted_naoh;

        assert!((full - 240.0 * 0.134).abs() < EPS);
        assert!((discounted - full * 0.92).abs() < EPS);
    }

    #[test]
    fn test_from_parts_restores_invariant_and_uniqueness() {
        let lines = vec![
            FormulationLine { id: "oliveOil".into(), percent: 50.0, grams: 1.0 },
            FormulationLine { id: "oliveOil".into(), percent: 20.0, grams: 2.0 },
        ];
        let f = Formulation::from_parts(SoapType::Saponificado, 600.0, 5.0, lines);
        assert_eq!(f.lines().len(), 1);
        assert!((f.lines()[0].grams - 300.0).abs() < EPS);
    }

    #[test]
    fn test_from_parts_keeps_grams_typed_by_hand() {
        let catalog = Catalog::builtin();
        let mut f = Formulation::new(SoapType::Glicerina, 700.0, 5.0);
        f.add_ingredient(&catalog, "maracuyaSeeds").unwrap();
        f.set_grams("maracuyaSeeds", &36.4.into()).unwrap();

        let rebuilt = Formulation::from_parts(
            f.soap_type(),
            f.batch_weight(),
            f.superfat(),
            f.lines().to_vec(),
        );
        assert_eq!(rebuilt, f);
        assert_eq!(rebuilt.lines()[0].grams, 36.4);
    }

    #[test]
    fn test_line_details_fallback() {
        let catalog = Catalog::builtin();
        let f = Formulation::from_parts(
            SoapType::Glicerina,
            800.0,
            5.0,
            vec![FormulationLine::from_percent("mystery", 1.0, 800.0)],
        );
        let details = f.line_details(&catalog);
        assert_eq!(details[0].name, "mystery");
        assert_eq!(details[0].category, "Personalizado");
    }
}
