use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::uuid_column;
use crate::db::DatabaseError;
use crate::models::Service;

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        clinic_id: uuid_column(row, 2)?,
    })
}

pub fn insert_service(conn: &Connection, service: &Service) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO services (id, name, clinic_id) VALUES (?1, ?2, ?3)",
        params![service.id.to_string(), service.name, service.clinic_id.to_string()],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &Uuid) -> Result<Option<Service>, DatabaseError> {
    let service = conn
        .query_row(
            "SELECT id, name, clinic_id FROM services WHERE id = ?1",
            params![id.to_string()],
            service_from_row,
        )
        .optional()?;
    Ok(service)
}

pub fn delete_service(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM services WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Service".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_services_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM services WHERE clinic_id = ?1",
        params![clinic_id.to_string()],
    )?;
    Ok(deleted)
}

pub fn list_services_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, clinic_id FROM services WHERE clinic_id = ?1 ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map(params![clinic_id.to_string()], service_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
