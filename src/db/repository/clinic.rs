use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{opt_uuid_column, uuid_column};
use crate::db::DatabaseError;
use crate::models::Clinic;

fn clinic_from_row(row: &Row<'_>) -> rusqlite::Result<Clinic> {
    Ok(Clinic {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        hospital_id: opt_uuid_column(row, 2)?,
    })
}

pub fn insert_clinic(conn: &Connection, clinic: &Clinic) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinics (id, name, hospital_id) VALUES (?1, ?2, ?3)",
        params![
            clinic.id.to_string(),
            clinic.name,
            clinic.hospital_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_clinic(conn: &Connection, id: &Uuid) -> Result<Option<Clinic>, DatabaseError> {
    let clinic = conn
        .query_row(
            "SELECT id, name, hospital_id FROM clinics WHERE id = ?1",
            params![id.to_string()],
            clinic_from_row,
        )
        .optional()?;
    Ok(clinic)
}

pub fn find_clinic_by_name(conn: &Connection, name: &str) -> Result<Option<Clinic>, DatabaseError> {
    let clinic = conn
        .query_row(
            "SELECT id, name, hospital_id FROM clinics WHERE name = ?1",
            params![name],
            clinic_from_row,
        )
        .optional()?;
    Ok(clinic)
}

pub fn list_clinics_for_hospital(conn: &Connection, hospital_id: &Uuid) -> Result<Vec<Clinic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, hospital_id FROM clinics WHERE hospital_id = ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map(params![hospital_id.to_string()], clinic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_clinics(conn: &Connection) -> Result<Vec<Clinic>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name, hospital_id FROM clinics ORDER BY name")?;
    let rows = stmt
        .query_map([], clinic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns false when no clinic has this id.
pub fn rename_clinic(conn: &Connection, id: &Uuid, name: &str) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE clinics SET name = ?1 WHERE id = ?2",
        params![name, id.to_string()],
    )?;
    Ok(updated > 0)
}

/// Delete the clinic row only. Dependent rows must already be gone, the
/// foreign keys reject anything else.
pub fn delete_clinic(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM clinics WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Clinic".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
