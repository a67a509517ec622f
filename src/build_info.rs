//! Build information module
//!
//! What this binary was built from: package version, compile stamp, and the
//! formulation constants baked into it.

use serde::Serialize;

use crate::db::migrations::SCHEMA_VERSION;
use crate::formulation::LYE_WATER_PERCENT_OF_OILS;
use crate::models::BUILTIN_INGREDIENTS;

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("AKLLA_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// Cargo profile, `debug` or `release`
pub const BUILD_PROFILE: &str = match option_env!("AKLLA_BUILD_PROFILE") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Build information for the status tool
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    /// Batch record schema this binary migrates to
    pub schema_version: i32,
    pub builtin_ingredients: usize,
    pub lye_water_percent: f64,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_timestamp: BUILD_TIMESTAMP,
            build_profile: BUILD_PROFILE,
            schema_version: SCHEMA_VERSION,
            builtin_ingredients: BUILTIN_INGREDIENTS.len(),
            lye_water_percent: LYE_WATER_PERCENT_OF_OILS,
        }
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    let info = BuildInfo::current();
    eprintln!("===============================================");
    eprintln!("  Aklla Soap Formulator v{} ({})", info.version, info.build_profile);
    eprintln!("  Compiled: {}", info.build_timestamp);
    eprintln!(
        "  Catalog: {} ingredients | Schema: v{} | Lye water: {}% of oils",
        info.builtin_ingredients, info.schema_version, info.lye_water_percent
    );
    eprintln!("===============================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_reports_baked_in_constants() {
        let info = BuildInfo::current();
        assert_eq!(info.name, "aklla");
        assert_eq!(info.version, VERSION);
        assert_eq!(info.builtin_ingredients, 21);
        assert_eq!(info.schema_version, SCHEMA_VERSION);
        assert_eq!(info.lye_water_percent, 38.0);
    }
}
