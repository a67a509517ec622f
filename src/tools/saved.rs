//! Saved Formulation MCP Tools
//!
//! Tools for the batch record book: save the current formulation under a
//! name and lot, then list, inspect, reload, annotate or delete records.

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::formulation::FormulationLine;
use crate::models::{
    Catalog, Formulation, FormulationExport, SavedFormulation, SavedFormulationCreate,
    SavedFormulationFilter, SavedFormulationUpdate, SoapType, BATCH_DATE_FORMAT,
};

use super::formulation::FormulationView;
use super::ToolError;

/// Response for save_formulation
#[derive(Debug, Serialize)]
pub struct SaveFormulationResponse {
    pub id: i64,
    pub name: String,
    pub lot_code: Option<String>,
    pub batch_date: String,
    pub line_count: usize,
    pub created_at: String,
}

/// Saved formulation with its recomputed contents
#[derive(Debug, Serialize)]
pub struct SavedFormulationDetail {
    #[serde(flatten)]
    pub record: SavedFormulation,
    pub lines: Vec<FormulationLine>,
    pub export: FormulationExport,
}

/// Summary row for list_saved_formulations
#[derive(Debug, Serialize)]
pub struct SavedFormulationSummary {
    pub id: i64,
    pub name: String,
    pub lot_code: Option<String>,
    pub operator: Option<String>,
    pub batch_date: String,
    pub soap_type: SoapType,
    pub batch_weight: f64,
    pub line_count: i64,
    pub created_at: String,
}

/// Response for list_saved_formulations
#[derive(Debug, Serialize)]
pub struct ListSavedFormulationsResponse {
    pub formulations: Vec<SavedFormulationSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for load_formulation
#[derive(Debug, Serialize)]
pub struct LoadFormulationResponse {
    pub loaded_id: i64,
    pub name: String,
    pub formulation: FormulationView,
}

/// Response for update_saved_formulation
#[derive(Debug, Serialize)]
pub struct UpdateSavedFormulationResponse {
    pub success: bool,
    pub updated_at: String,
}

/// Response for delete_saved_formulation
#[derive(Debug, Serialize)]
pub struct DeleteSavedFormulationResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Parse a `YYYY-MM-DD` batch date
pub fn parse_batch_date(raw: &str) -> Result<NaiveDate, ToolError> {
    NaiveDate::parse_from_str(raw.trim(), BATCH_DATE_FORMAT).map_err(|_| {
        ToolError::InvalidInput(format!("Invalid batch_date '{}': expected YYYY-MM-DD", raw))
    })
}

/// Empty or whitespace-only text is treated as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trimmed, non-empty record name
fn required_name(name: &str) -> Result<String, ToolError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ToolError::InvalidInput("Formulation name cannot be empty".to_string()));
    }
    Ok(name.to_string())
}

fn not_found(id: i64) -> ToolError {
    ToolError::NotFound(format!("Saved formulation not found with id: {}", id))
}

// ============================================================================
// Saved Formulation Tools
// ============================================================================

/// Save the current formulation as a batch record
pub fn save_formulation(
    db: &Database,
    formulation: &Formulation,
    name: &str,
    lot_code: Option<String>,
    operator: Option<String>,
    batch_date: Option<&str>,
    notes: Option<String>,
) -> Result<SaveFormulationResponse, ToolError> {
    let name = required_name(name)?;

    let batch_date = match batch_date {
        Some(raw) => parse_batch_date(raw)?,
        None => chrono::Local::now().date_naive(),
    };

    let data = SavedFormulationCreate {
        name,
        lot_code: non_blank(lot_code),
        operator: non_blank(operator),
        batch_date,
        notes: non_blank(notes),
    };

    let saved = db
        .with_transaction(|tx| SavedFormulation::create(tx, &data, formulation))
        .map_err(ToolError::storage("Failed to save formulation"))?;

    tracing::info!(id = saved.id, name = %saved.name, "Saved formulation");

    Ok(SaveFormulationResponse {
        id: saved.id,
        name: saved.name,
        lot_code: saved.lot_code,
        batch_date: saved.batch_date,
        line_count: formulation.lines().len(),
        created_at: saved.created_at,
    })
}

/// List saved formulations, newest first
pub fn list_saved_formulations(
    db: &Database,
    query: Option<&str>,
    soap_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListSavedFormulationsResponse, ToolError> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let soap_type = soap_type
        .map(|raw| {
            SoapType::from_str(raw)
                .ok_or_else(|| ToolError::InvalidInput(format!("Unknown soap type '{}'", raw)))
        })
        .transpose()?;
    let filter = SavedFormulationFilter {
        query: query.map(str::trim).filter(|q| !q.is_empty()),
        soap_type,
    };

    let conn = db.get_conn().map_err(ToolError::storage("Database error"))?;

    let saved = SavedFormulation::list(&conn, &filter, limit, offset)
        .map_err(ToolError::storage("Failed to list formulations"))?;

    let total = SavedFormulation::count(&conn, &filter)
        .map_err(ToolError::storage("Failed to count formulations"))?;

    let mut formulations = Vec::new();
    for record in saved {
        let line_count = SavedFormulation::line_count(&conn, record.id)
            .map_err(ToolError::storage("Failed to count lines"))?;

        formulations.push(SavedFormulationSummary {
            id: record.id,
            name: record.name,
            lot_code: record.lot_code,
            operator: record.operator,
            batch_date: record.batch_date,
            soap_type: record.soap_type,
            batch_weight: record.batch_weight,
            line_count,
            created_at: record.created_at,
        });
    }

    Ok(ListSavedFormulationsResponse {
        formulations,
        total,
        limit,
        offset,
    })
}

/// Get a saved formulation with its lines and recomputed export
pub fn get_saved_formulation(
    db: &Database,
    catalog: &Catalog,
    id: i64,
) -> Result<Option<SavedFormulationDetail>, ToolError> {
    let conn = db.get_conn().map_err(ToolError::storage("Database error"))?;

    let record = SavedFormulation::get_by_id(&conn, id)
        .map_err(ToolError::storage("Failed to get formulation"))?;

    match record {
        Some(record) => {
            let formulation = record
                .to_formulation(&conn)
                .map_err(ToolError::storage("Failed to read formulation lines"))?;

            Ok(Some(SavedFormulationDetail {
                lines: formulation.lines().to_vec(),
                export: formulation.export(catalog),
                record,
            }))
        }
        None => Ok(None),
    }
}

/// Read a saved formulation back as a working formulation
pub fn read_saved_formulation(db: &Database, id: i64) -> Result<(SavedFormulation, Formulation), ToolError> {
    let conn = db.get_conn().map_err(ToolError::storage("Database error"))?;

    let record = SavedFormulation::get_by_id(&conn, id)
        .map_err(ToolError::storage("Failed to get formulation"))?
        .ok_or_else(|| not_found(id))?;

    let formulation = record
        .to_formulation(&conn)
        .map_err(ToolError::storage("Failed to read formulation lines"))?;

    Ok((record, formulation))
}

/// Replace the current formulation with a saved one
pub fn load_formulation(
    db: &Database,
    catalog: &Catalog,
    current: &mut Formulation,
    id: i64,
) -> Result<LoadFormulationResponse, ToolError> {
    let (record, formulation) = read_saved_formulation(db, id)?;
    *current = formulation;

    tracing::info!(id, name = %record.name, "Loaded saved formulation");

    Ok(LoadFormulationResponse {
        loaded_id: record.id,
        name: record.name,
        formulation: FormulationView::of(current, catalog),
    })
}

/// Update a saved formulation's record details
///
/// A blank lot code, operator or note clears it.
pub fn update_saved_formulation(
    db: &Database,
    id: i64,
    name: Option<String>,
    lot_code: Option<String>,
    operator: Option<String>,
    batch_date: Option<&str>,
    notes: Option<String>,
) -> Result<UpdateSavedFormulationResponse, ToolError> {
    let data = SavedFormulationUpdate {
        name: name.as_deref().map(required_name).transpose()?,
        lot_code: lot_code.map(|v| non_blank(Some(v))),
        operator: operator.map(|v| non_blank(Some(v))),
        batch_date: batch_date.map(parse_batch_date).transpose()?,
        notes: notes.map(|v| non_blank(Some(v))),
    };

    let conn = db.get_conn().map_err(ToolError::storage("Database error"))?;

    let updated = SavedFormulation::update(&conn, id, &data)
        .map_err(ToolError::storage("Failed to update formulation"))?
        .ok_or_else(|| not_found(id))?;

    Ok(UpdateSavedFormulationResponse {
        success: true,
        updated_at: updated.updated_at,
    })
}

/// Delete a saved formulation and its lines
pub fn delete_saved_formulation(db: &Database, id: i64) -> Result<DeleteSavedFormulationResponse, ToolError> {
    let conn = db.get_conn().map_err(ToolError::storage("Database error"))?;

    let deleted = SavedFormulation::delete(&conn, id)
        .map_err(ToolError::storage("Failed to delete formulation"))?;
    if !deleted {
        return Err(not_found(id));
    }

    tracing::info!(id, "Deleted saved formulation");

    Ok(DeleteSavedFormulationResponse {
        success: true,
        deleted_id: id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A migrated database in its own temp dir; the dir goes away on drop
    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("aklla.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn test_save_requires_name_and_valid_date() {
        let (db, _dir) = test_db();
        let f = Formulation::default();

        let err = save_formulation(&db, &f, "  ", None, None, None, None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = save_formulation(&db, &f, "Carbón", None, None, Some("17/10/2026"), None).unwrap_err();
        assert!(err.is_caller_error());
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_save_defaults_date_to_today() {
        let (db, _dir) = test_db();
        let response =
            save_formulation(&db, &Formulation::default(), "Carbón", Some(" ".into()), None, None, None)
                .unwrap();
        assert_eq!(response.line_count, 4);
        assert_eq!(response.lot_code, None);
        assert_eq!(
            response.batch_date,
            chrono::Local::now().date_naive().format(BATCH_DATE_FORMAT).to_string()
        );
    }

    #[test]
    fn test_save_then_load_replaces_current() {
        let (db, _dir) = test_db();
        let catalog = Catalog::builtin();

        let mut saved = Formulation::new(SoapType::Saponificado, 1000.0, 6.0);
        saved.add_ingredient(&catalog, "oliveOil").unwrap();
        saved.add_ingredient(&catalog, "coconutOil").unwrap();
        saved.set_grams("coconutOil", &"123.4".into()).unwrap();
        let response =
            save_formulation(&db, &saved, "Oliva", Some("CP-1".into()), None, Some("2026-10-17"), None)
                .unwrap();

        let mut current = Formulation::default();
        let loaded = load_formulation(&db, &catalog, &mut current, response.id).unwrap();
        assert_eq!(current, saved);
        assert_eq!(current.line("coconutOil").unwrap().grams, 123.4);
        assert_eq!(loaded.formulation.summary.soap_type, SoapType::Saponificado);
        assert!(loaded.formulation.summary.naoh.is_some());

        let detail = get_saved_formulation(&db, &catalog, response.id).unwrap().unwrap();
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.export.batch_weight, 1000.0);
        assert_eq!(detail.export.ingredients[1].grams, 123.4);
        assert!(detail.export.naoh.is_some());
    }

    #[test]
    fn test_load_missing_keeps_current() {
        let (db, _dir) = test_db();
        let catalog = Catalog::builtin();
        let mut current = Formulation::default();
        let err = load_formulation(&db, &catalog, &mut current, 42).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert_eq!(current, Formulation::default());
    }

    #[test]
    fn test_list_clamps_and_filters() {
        let (db, _dir) = test_db();
        let f = Formulation::default();
        save_formulation(&db, &f, "Carbón", None, None, None, None).unwrap();
        save_formulation(&db, &f, "Arroz", None, None, None, None).unwrap();

        let all = list_saved_formulations(&db, None, None, 0, -5).unwrap();
        assert_eq!(all.limit, 1);
        assert_eq!(all.offset, 0);
        assert_eq!(all.total, 2);
        assert_eq!(all.formulations.len(), 1);
        assert_eq!(all.formulations[0].line_count, 4);

        let cold = list_saved_formulations(&db, None, Some("saponificado"), 50, 0).unwrap();
        assert_eq!(cold.total, 0);

        let err = list_saved_formulations(&db, None, Some("hot"), 50, 0).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_update_blank_fields_clear_them() {
        let (db, _dir) = test_db();
        let id = save_formulation(
            &db,
            &Formulation::default(),
            "Carbón",
            Some("L1".into()),
            Some("Ana".into()),
            None,
            Some("Lote de prueba".into()),
        )
        .unwrap()
        .id;

        update_saved_formulation(&db, id, None, Some("   ".into()), Some(" Rosa ".into()), None, Some("".into()))
            .unwrap();

        let (record, _) = read_saved_formulation(&db, id).unwrap();
        assert_eq!(record.lot_code, None);
        assert_eq!(record.operator.as_deref(), Some("Rosa"));
        assert_eq!(record.notes, None);
        assert_eq!(record.name, "Carbón");
    }

    #[test]
    fn test_update_and_delete() {
        let (db, _dir) = test_db();
        let id = save_formulation(&db, &Formulation::default(), "Borrador", None, None, None, None)
            .unwrap()
            .id;

        let err = update_saved_formulation(&db, id, Some("".into()), None, None, None, None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        update_saved_formulation(&db, id, None, None, Some("Rosa".into()), Some("2026-01-02"), None)
            .unwrap();
        let (record, _) = read_saved_formulation(&db, id).unwrap();
        assert_eq!(record.operator.as_deref(), Some("Rosa"));
        assert_eq!(record.batch_date, "2026-01-02");

        assert!(delete_saved_formulation(&db, id).unwrap().success);
        assert!(matches!(delete_saved_formulation(&db, id), Err(ToolError::NotFound(_))));
        assert!(update_saved_formulation(&db, id, None, None, None, None, Some("x".into())).is_err());
    }
}
