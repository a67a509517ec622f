//! Raw numeric input coercion
//!
//! Edits never fail on bad numbers: anything that is not a finite number
//! becomes 0, and the batch weight has a floor of 1 gram.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Smallest batch weight accepted, in grams
pub const MIN_BATCH_GRAMS: f64 = 1.0;

/// A number as typed by the user, either already numeric or as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Coerce raw input to a finite number, defaulting to 0
pub fn coerce_number(input: &NumericInput) -> f64 {
    let value = match input {
        NumericInput::Number(n) => *n,
        NumericInput::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return 0.0;
            }
            match trimmed.parse::<f64>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!("Non-numeric input '{}' treated as 0", s);
                    return 0.0;
                }
            }
        }
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Coerce a batch weight, clamping to [`MIN_BATCH_GRAMS`]
pub fn coerce_batch_weight(input: &NumericInput) -> f64 {
    coerce_number(input).max(MIN_BATCH_GRAMS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numbers_pass_through() {
        assert_eq!(coerce_number(&12.5.into()), 12.5);
        assert_eq!(coerce_number(&(-3.0).into()), -3.0);
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce_number(&"6.25".into()), 6.25);
        assert_eq!(coerce_number(&"  40 ".into()), 40.0);
        assert_eq!(coerce_number(&"".into()), 0.0);
        assert_eq!(coerce_number(&"abc".into()), 0.0);
        assert_eq!(coerce_number(&"12g".into()), 0.0);
    }

    #[test]
    fn test_coerce_non_finite() {
        assert_eq!(coerce_number(&f64::NAN.into()), 0.0);
        assert_eq!(coerce_number(&f64::INFINITY.into()), 0.0);
        assert_eq!(coerce_number(&"inf".into()), 0.0);
        assert_eq!(coerce_number(&"NaN".into()), 0.0);
    }

    #[test]
    fn test_coerce_batch_weight_floor() {
        assert_eq!(coerce_batch_weight(&1000.0.into()), 1000.0);
        assert_eq!(coerce_batch_weight(&0.0.into()), MIN_BATCH_GRAMS);
        assert_eq!(coerce_batch_weight(&(-50.0).into()), MIN_BATCH_GRAMS);
        assert_eq!(coerce_batch_weight(&"heavy".into()), MIN_BATCH_GRAMS);
        assert_eq!(coerce_batch_weight(&0.5.into()), MIN_BATCH_GRAMS);
    }

    #[test]
    fn test_deserialize_either_shape() {
        let n: NumericInput = serde_json::from_str("12").unwrap();
        assert_eq!(n, NumericInput::Number(12.0));
        let s: NumericInput = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(coerce_number(&s), 12.0);
    }
}
