//! Saved formulation model
//!
//! A batch record: a named snapshot of a formulation with lot, operator and
//! date, stored with its ingredient lines.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::formulation::FormulationLine;
use super::{Formulation, SoapType};

/// Storage format of `batch_date`
pub const BATCH_DATE_FORMAT: &str = "%Y-%m-%d";

/// A saved formulation header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedFormulation {
    pub id: i64,
    pub name: String,
    pub lot_code: Option<String>,
    pub operator: Option<String>,
    pub batch_date: String,
    pub soap_type: SoapType,
    pub batch_weight: f64,
    pub superfat: f64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for saving a formulation
#[derive(Debug, Clone)]
pub struct SavedFormulationCreate {
    pub name: String,
    pub lot_code: Option<String>,
    pub operator: Option<String>,
    pub batch_date: NaiveDate,
    pub notes: Option<String>,
}

/// Data for updating a saved formulation's record details
///
/// `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct SavedFormulationUpdate {
    pub name: Option<String>,
    pub lot_code: Option<Option<String>>,
    pub operator: Option<Option<String>>,
    pub batch_date: Option<NaiveDate>,
    pub notes: Option<Option<String>>,
}

/// Filters for listing saved formulations
#[derive(Debug, Clone, Default)]
pub struct SavedFormulationFilter<'a> {
    /// Matches name or lot code
    pub query: Option<&'a str>,
    pub soap_type: Option<SoapType>,
}

impl SavedFormulationFilter<'_> {
    /// WHERE clause and its parameters, numbered from ?1
    fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clauses = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(q) = self.query {
            let n = params_vec.len() + 1;
            clauses.push(format!("(name LIKE ?{n} OR lot_code LIKE ?{n})"));
            params_vec.push(Box::new(format!("%{}%", q)));
        }
        if let Some(soap_type) = self.soap_type {
            clauses.push(format!("soap_type = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(soap_type));
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        (sql, params_vec)
    }
}

impl SavedFormulation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            lot_code: row.get("lot_code")?,
            operator: row.get("operator")?,
            batch_date: row.get("batch_date")?,
            soap_type: row.get("soap_type")?,
            batch_weight: row.get("batch_weight")?,
            superfat: row.get("superfat")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Save a formulation and its lines
    ///
    /// Run it inside a transaction (`Database::with_transaction`) so a record
    /// is never stored without its lines.
    pub fn create(
        conn: &Connection,
        data: &SavedFormulationCreate,
        formulation: &Formulation,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO formulations
                (name, lot_code, operator, batch_date, soap_type, batch_weight, superfat, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                data.name,
                data.lot_code,
                data.operator,
                data.batch_date.format(BATCH_DATE_FORMAT).to_string(),
                formulation.soap_type(),
                formulation.batch_weight(),
                formulation.superfat(),
                data.notes,
            ],
        )?;
        let id = conn.last_insert_rowid();

        {
            let mut stmt = conn.prepare(
                r#"
                INSERT INTO formulation_lines (formulation_id, position, ingredient_id, percent, grams)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (position, line) in formulation.lines().iter().enumerate() {
                stmt.execute(params![id, position as i64, line.id, line.percent, line.grams])?;
            }
        }

        Self::get_by_id(conn, id)?
            .ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM formulations WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(saved) => Ok(Some(saved)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Lines of a saved formulation, in their original order
    pub fn get_lines(conn: &Connection, id: i64) -> DbResult<Vec<FormulationLine>> {
        let mut stmt = conn.prepare(
            "SELECT ingredient_id, percent, grams FROM formulation_lines
             WHERE formulation_id = ?1 ORDER BY position",
        )?;

        let lines = stmt
            .query_map([id], |row| {
                Ok(FormulationLine {
                    id: row.get("ingredient_id")?,
                    percent: row.get("percent")?,
                    grams: row.get("grams")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(lines)
    }

    /// Rebuild the working formulation from this record
    pub fn to_formulation(&self, conn: &Connection) -> DbResult<Formulation> {
        if self.batch_weight < 1.0 {
            return Err(DbError::InvalidData(format!(
                "formulation {} has batch weight {}",
                self.id, self.batch_weight
            )));
        }
        let lines = Self::get_lines(conn, self.id)?;
        Ok(Formulation::from_parts(
            self.soap_type,
            self.batch_weight,
            self.superfat,
            lines,
        ))
    }

    /// List saved formulations, newest first
    pub fn list(
        conn: &Connection,
        filter: &SavedFormulationFilter,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let (where_sql, mut params_vec) = filter.where_clause();
        let sql = format!(
            "SELECT * FROM formulations {} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            where_sql,
            params_vec.len() + 1,
            params_vec.len() + 2
        );
        params_vec.push(Box::new(limit));
        params_vec.push(Box::new(offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let saved = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(saved)
    }

    /// Count saved formulations matching a filter
    pub fn count(conn: &Connection, filter: &SavedFormulationFilter) -> DbResult<i64> {
        let (where_sql, params_vec) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM formulations {}", where_sql);
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Number of lines in a saved formulation
    pub fn line_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM formulation_lines WHERE formulation_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Update record details; the ingredient lines are never edited in place
    pub fn update(conn: &Connection, id: i64, data: &SavedFormulationUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            updates.push(format!("name = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(name.clone()));
        }
        if let Some(ref lot_code) = data.lot_code {
            updates.push(format!("lot_code = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(lot_code.clone()));
        }
        if let Some(ref operator) = data.operator {
            updates.push(format!("operator = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(operator.clone()));
        }
        if let Some(batch_date) = data.batch_date {
            updates.push(format!("batch_date = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(batch_date.format(BATCH_DATE_FORMAT).to_string()));
        }
        if let Some(ref notes) = data.notes {
            updates.push(format!("notes = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(notes.clone()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE formulations SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );

        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Delete a saved formulation; its lines cascade
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM formulations WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
