//! Formulation engine
//!
//! Stateless conversions between percent and grams of a batch, the NaOH
//! estimate for cold-process soap, and the two normalization passes.
//! Nothing here rounds; callers round for display.

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Lye water as a percentage of total oil weight
pub const LYE_WATER_PERCENT_OF_OILS: f64 = 38.0;

// ============================================================================
// Types
// ============================================================================

/// One ingredient of a formulation, as a share of the batch and as a mass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulationLine {
    /// Catalog id of the ingredient
    pub id: String,
    /// Percent of total batch weight
    pub percent: f64,
    /// Absolute mass in grams
    pub grams: f64,
}

impl FormulationLine {
    /// Build a line from its percent, deriving grams from the batch weight
    pub fn from_percent(id: impl Into<String>, percent: f64, batch_grams: f64) -> Self {
        Self {
            id: id.into(),
            percent,
            grams: percent_to_grams(percent, batch_grams),
        }
    }
}

/// An oil line as the NaOH estimate sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OilLine {
    pub percent: f64,
    /// Grams of NaOH per gram of oil; `None` for entries without a SAP value
    pub sap_naoh: Option<f64>,
}

/// Lye requirement for a set of oils
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NaohEstimate {
    pub total_oil_grams: f64,
    /// NaOH needed to saponify every oil completely
    pub unadjusted_naoh: f64,
    /// NaOH to actually weigh out, after the superfat discount
    pub adjusted_naoh: f64,
    pub lye_water_grams: f64,
}

// ============================================================================
// Conversions
// ============================================================================

/// Grams of an ingredient at `percent` of a `total_batch_grams` batch
pub fn percent_to_grams(percent: f64, total_batch_grams: f64) -> f64 {
    (percent / 100.0) * total_batch_grams
}

/// Percent of a `total_batch_grams` batch that `grams` represents
///
/// An empty batch has no meaningful share, so this returns 0.
pub fn grams_to_percent(grams: f64, total_batch_grams: f64) -> f64 {
    if total_batch_grams == 0.0 {
        return 0.0;
    }
    (grams / total_batch_grams) * 100.0
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn total_percent(lines: &[FormulationLine]) -> f64 {
    lines.iter().fold(0.0, |acc, l| acc + l.percent)
}

pub fn total_grams(lines: &[FormulationLine]) -> f64 {
    lines.iter().fold(0.0, |acc, l| acc + l.grams)
}

// ============================================================================
// NaOH
// ============================================================================

/// Estimate NaOH and lye water for the given oils
///
/// Oils without a SAP value still count toward the oil weight (and so the
/// water) but need no lye.
pub fn estimate_naoh(
    oil_lines: &[OilLine],
    total_batch_grams: f64,
    superfat_percent: f64,
) -> NaohEstimate {
    let mut total_oil_grams = 0.0;
    let mut unadjusted_naoh = 0.0;

    for oil in oil_lines {
        let grams = percent_to_grams(oil.percent, total_batch_grams);
        total_oil_grams += grams;

        if let Some(sap) = oil.sap_naoh {
            unadjusted_naoh += grams * sap;
        }
    }

    NaohEstimate {
        total_oil_grams,
        unadjusted_naoh,
        adjusted_naoh: unadjusted_naoh * (1.0 - superfat_percent / 100.0),
        lye_water_grams: (LYE_WATER_PERCENT_OF_OILS / 100.0) * total_oil_grams,
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Scale every percent so the total is exactly 100, keeping proportions
///
/// Returns the lines unchanged when their percents sum to zero or less.
pub fn rebalance_to_hundred(lines: &[FormulationLine], batch_grams: f64) -> Vec<FormulationLine> {
    let total = total_percent(lines);
    if total <= 0.0 {
        return lines.to_vec();
    }

    let factor = 100.0 / total;
    lines
        .iter()
        .map(|line| FormulationLine::from_percent(line.id.clone(), line.percent * factor, batch_grams))
        .collect()
}

/// Give the base ingredient whatever share the other lines leave free
///
/// The base never goes negative. When it is missing it is appended with the
/// computed share.
pub fn fill_base_to_hundred(
    lines: &[FormulationLine],
    base_id: &str,
    batch_grams: f64,
) -> Vec<FormulationLine> {
    let others: f64 = lines
        .iter()
        .filter(|l| l.id != base_id)
        .map(|l| l.percent)
        .sum();
    let base = FormulationLine::from_percent(base_id, (100.0 - others).max(0.0), batch_grams);

    let mut result = lines.to_vec();
    match result.iter_mut().find(|l| l.id == base_id) {
        Some(existing) => *existing = base,
        None => result.push(base),
    }
    result
}
