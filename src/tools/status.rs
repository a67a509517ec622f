//! Aklla Status Tool
//!
//! Runtime status of the service, plus the usage guide for assistants.

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::Database;

/// Formulation instructions for AI assistants
pub const FORMULATION_INSTRUCTIONS: &str = r#"
# Aklla Formulation Instructions

This guide explains how to build a soap formulation with the Aklla tools.

## Overview

The server holds ONE current formulation. Every edit returns the full
recomputed formulation (lines, totals, suggested pH and, for cold process,
the NaOH estimate). Start with `get_formulation` to see where things stand.

Two soap types:
- **glicerina** (melt-and-pour): a pre-made glycerin base plus additives.
  No lye is handled.
- **saponificado** (cold process): vegetable oils reacted with NaOH.

---

## Building a Formulation

1. `set_soap_type` - "glicerina" or "saponificado"
2. `set_batch_weight` - total batch in grams (minimum 1 g)
3. `list_catalog` - browse ingredients, optionally by category
4. `add_ingredient` - adds a catalog ingredient at its default percent
5. `update_ingredient_percent` or `update_ingredient_grams` - adjust a line
6. `remove_ingredient` / `clear_formulation` - drop lines

Percent is always a share of the batch weight, and grams follow from it.
Changing the batch weight keeps every percent and rescales the grams.

Numbers may be sent as JSON numbers or text ("3", " 12.5 "). Text that is
not a number counts as 0.

---

## Reaching 100%

- `fill_base_to_hundred` (melt-and-pour only): gives the glycerin base
  whatever share the other lines leave free. The base is added if missing.
- `rebalance_to_hundred`: scales every line proportionally so the total is
  exactly 100%.

**Cold process is never auto-filled.** Oils react with lye, so
`fill_base_to_hundred` refuses and you must adjust the oil percentages by
hand. Watch the NaOH estimate after each change.

---

## Lye (cold process)

`estimate_naoh` reports, for the vegetable oils in the formulation:
- total oil grams
- NaOH before superfat (oil grams x SAP value)
- NaOH after superfat (set with `set_superfat`, default 5%)
- lye water at 38% of the oil weight

**IMPORTANT:** the estimate is a guide. Always confirm with a dedicated lye
calculator before making a batch.

---

## Saving Batches

- `save_formulation` - store the current formulation with a name, optional
  lot code, operator, batch date (YYYY-MM-DD, defaults to today) and notes
- `list_saved_formulations` / `get_saved_formulation` - browse the record book
- `load_formulation` - make a saved formulation the current one
- `update_saved_formulation` - fix name, lot, operator, date or notes
- `delete_saved_formulation` - remove a record

Record the lot code, date and operator for every batch you make.

`export_formulation` returns the current formulation as the JSON document
used for sharing and archiving.
"#;

/// Runtime status of the Aklla service
#[derive(Debug, Clone, Serialize)]
pub struct AkllaStatus {
    /// Build information
    pub build: BuildInfo,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Catalog information
    pub catalog_size: usize,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database: Database,
}

impl StatusTracker {
    pub fn new(database: Database) -> Self {
        Self {
            start_time: Instant::now(),
            database,
        }
    }

    /// Get the current status
    pub fn get_status(&self, catalog_size: usize) -> AkllaStatus {
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        AkllaStatus {
            build: BuildInfo::current(),
            database_path: self.database.path().display().to_string(),
            database_size_bytes: self.database.size_bytes(),
            catalog_size,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_database_and_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let database = Database::open(dir.path().join("aklla.db")).unwrap();
        let tracker = StatusTracker::new(database);

        let status = tracker.get_status(21);
        assert!(status.database_size_bytes.is_some());
        assert!(status.database_path.ends_with("aklla.db"));
        assert_eq!(status.catalog_size, 21);
        assert_eq!(status.build.schema_version, 1);
        assert_eq!(status.process_id, std::process::id());
    }
}
