//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: saved formulations
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FORMULATIONS
        -- Saved batch records
        -- ============================================
        CREATE TABLE formulations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            lot_code TEXT,                       -- producer's batch/lot label
            operator TEXT,                       -- who made the batch
            batch_date TEXT NOT NULL,            -- ISO date: "2026-10-17"

            soap_type TEXT NOT NULL CHECK(soap_type IN ('glicerina', 'saponificado')),
            batch_weight REAL NOT NULL CHECK(batch_weight >= 1),   -- grams
            superfat REAL NOT NULL DEFAULT 5,    -- percent, cold process only

            -- Metadata
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_formulations_name ON formulations(name);
        CREATE INDEX idx_formulations_lot ON formulations(lot_code);
        CREATE INDEX idx_formulations_date ON formulations(batch_date);

        -- ============================================
        -- FORMULATION LINES
        -- Ingredients of a saved formulation, in entry order
        -- ============================================
        CREATE TABLE formulation_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            formulation_id INTEGER NOT NULL REFERENCES formulations(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            ingredient_id TEXT NOT NULL,         -- catalog id
            percent REAL NOT NULL,               -- of batch weight
            grams REAL NOT NULL,

            UNIQUE(formulation_id, ingredient_id)
        );

        CREATE INDEX idx_formulation_lines_formulation ON formulation_lines(formulation_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
