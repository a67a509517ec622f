//! Formulation calculation module
//!
//! Pure percent/grams conversions, NaOH estimation and input coercion.

pub mod engine;
pub mod input;

pub use engine::{
    estimate_naoh, fill_base_to_hundred, grams_to_percent, percent_to_grams,
    rebalance_to_hundred, round_to, total_grams, total_percent, FormulationLine, NaohEstimate,
    OilLine, LYE_WATER_PERCENT_OF_OILS,
};
pub use input::{coerce_batch_weight, coerce_number, NumericInput, MIN_BATCH_GRAMS};
