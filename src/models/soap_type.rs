//! Soap type
//!
//! Melt-and-pour works from a pre-made glycerin base; cold process reacts
//! vegetable oils with NaOH.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoapType {
    /// Melt-and-pour
    #[default]
    Glicerina,
    /// Cold process
    Saponificado,
}

impl SoapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoapType::Glicerina => "glicerina",
            SoapType::Saponificado => "saponificado",
        }
    }

    /// Parse a soap type; accepts the English names too
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "glicerina" | "melt-and-pour" | "melt_and_pour" | "m&p" => Some(SoapType::Glicerina),
            "saponificado" | "cold-process" | "cold_process" | "cp" => Some(SoapType::Saponificado),
            _ => None,
        }
    }

    /// Target pH range for the finished bar
    pub fn suggested_ph(&self) -> &'static str {
        match self {
            SoapType::Glicerina => "7.0 - 8.5 (ideal 7.0 - 7.5 para bebés)",
            SoapType::Saponificado => "9.0 - 10.5 (normal en saponificado)",
        }
    }

    pub fn requires_lye(&self) -> bool {
        matches!(self, SoapType::Saponificado)
    }
}

impl ToSql for SoapType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SoapType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        SoapType::from_str(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown soap type '{}'", s).into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(SoapType::from_str("Glicerina"), Some(SoapType::Glicerina));
        assert_eq!(SoapType::from_str("cold-process"), Some(SoapType::Saponificado));
        assert_eq!(SoapType::from_str("hot-process"), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&SoapType::Saponificado).unwrap(), "\"saponificado\"");
        let parsed: SoapType = serde_json::from_str("\"glicerina\"").unwrap();
        assert_eq!(parsed, SoapType::Glicerina);
    }
}
