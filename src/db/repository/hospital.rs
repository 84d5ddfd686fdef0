use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_column;
use crate::db::DatabaseError;
use crate::models::Hospital;

fn hospital_from_row(row: &Row<'_>) -> rusqlite::Result<Hospital> {
    Ok(Hospital {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
    })
}

pub fn insert_hospital(conn: &Connection, hospital: &Hospital) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO hospitals (id, name) VALUES (?1, ?2)",
        params![hospital.id.to_string(), hospital.name],
    )?;
    Ok(())
}

pub fn get_hospital(conn: &Connection, id: &Uuid) -> Result<Option<Hospital>, DatabaseError> {
    let hospital = conn
        .query_row(
            "SELECT id, name FROM hospitals WHERE id = ?1",
            params![id.to_string()],
            hospital_from_row,
        )
        .optional()?;
    Ok(hospital)
}

pub fn find_hospital_by_name(conn: &Connection, name: &str) -> Result<Option<Hospital>, DatabaseError> {
    let hospital = conn
        .query_row(
            "SELECT id, name FROM hospitals WHERE name = ?1",
            params![name],
            hospital_from_row,
        )
        .optional()?;
    Ok(hospital)
}

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name FROM hospitals ORDER BY name")?;
    let rows = stmt
        .query_map([], hospital_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns false when no hospital has this id.
pub fn rename_hospital(conn: &Connection, id: &Uuid, name: &str) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE hospitals SET name = ?1 WHERE id = ?2",
        params![name, id.to_string()],
    )?;
    Ok(updated > 0)
}

/// Delete the hospital row only. Owned clinics must already be gone.
pub fn delete_hospital(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM hospitals WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Hospital".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
