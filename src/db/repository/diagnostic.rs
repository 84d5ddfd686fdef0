use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{opt_uuid_column, uuid_column};
use crate::db::DatabaseError;
use crate::models::Diagnostic;

pub(crate) fn diagnostic_from_row(row: &Row<'_>) -> rusqlite::Result<Diagnostic> {
    Ok(Diagnostic {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        clinic_id: uuid_column(row, 3)?,
        creator_id: opt_uuid_column(row, 4)?,
    })
}

pub fn insert_diagnostic(conn: &Connection, diag: &Diagnostic) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO diagnostics (id, name, description, clinic_id, creator_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            diag.id.to_string(),
            diag.name,
            diag.description,
            diag.clinic_id.to_string(),
            diag.creator_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_diagnostic(conn: &Connection, id: &Uuid) -> Result<Option<Diagnostic>, DatabaseError> {
    let diag = conn
        .query_row(
            "SELECT id, name, description, clinic_id, creator_id FROM diagnostics WHERE id = ?1",
            params![id.to_string()],
            diagnostic_from_row,
        )
        .optional()?;
    Ok(diag)
}

/// Name and description only; the owning clinic never changes.
pub fn update_diagnostic(
    conn: &Connection,
    id: &Uuid,
    name: &str,
    description: &str,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE diagnostics SET name = ?1, description = ?2 WHERE id = ?3",
        params![name, description, id.to_string()],
    )?;
    Ok(updated > 0)
}

/// Delete the definition row only. Patient records must already be gone.
pub fn delete_diagnostic(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM diagnostics WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Diagnostic".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_diagnostics_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM diagnostics WHERE clinic_id = ?1",
        params![clinic_id.to_string()],
    )?;
    Ok(deleted)
}

pub fn list_diagnostics_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Diagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, clinic_id, creator_id FROM diagnostics
         WHERE clinic_id = ?1 ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map(params![clinic_id.to_string()], diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every diagnostic, ordered so equal creators are adjacent (null creators first).
pub fn list_diagnostics_by_creator(conn: &Connection) -> Result<Vec<Diagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, clinic_id, creator_id FROM diagnostics
         ORDER BY creator_id, name, id",
    )?;
    let rows = stmt
        .query_map([], diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_diagnostics_created_by(conn: &Connection, creator_id: &Uuid) -> Result<Vec<Diagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, clinic_id, creator_id FROM diagnostics
         WHERE creator_id = ?1 ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map(params![creator_id.to_string()], diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Diagnostics of `clinic_id` that the patient does not have yet.
pub fn list_available_diagnostics(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<Vec<Diagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.description, d.clinic_id, d.creator_id FROM diagnostics d
         WHERE d.clinic_id = ?2
           AND NOT EXISTS (
               SELECT 1 FROM patient_diagnostics pd
               WHERE pd.diagnostic_id = d.id AND pd.patient_id = ?1
           )
         ORDER BY d.name, d.id",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string(), clinic_id.to_string()], diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Diagnostics of `clinic_id` that the patient has been assigned.
pub fn list_assigned_diagnostics(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<Vec<Diagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.description, d.clinic_id, d.creator_id FROM diagnostics d
         JOIN patient_diagnostics pd ON pd.diagnostic_id = d.id
         WHERE pd.patient_id = ?1 AND d.clinic_id = ?2
         ORDER BY d.name, d.id",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string(), clinic_id.to_string()], diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
