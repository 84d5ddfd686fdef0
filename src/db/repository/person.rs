use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{opt_uuid_column, uuid_column};
use crate::db::DatabaseError;
use crate::models::Person;

pub(crate) fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        clinic_id: opt_uuid_column(row, 3)?,
    })
}

pub fn insert_person(conn: &Connection, person: &Person) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO people (id, email, display_name, clinic_id) VALUES (?1, ?2, ?3, ?4)",
        params![
            person.id.to_string(),
            person.email,
            person.display_name,
            person.clinic_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn get_person(conn: &Connection, id: &Uuid) -> Result<Option<Person>, DatabaseError> {
    let person = conn
        .query_row(
            "SELECT id, email, display_name, clinic_id FROM people WHERE id = ?1",
            params![id.to_string()],
            person_from_row,
        )
        .optional()?;
    Ok(person)
}

/// Email comparison is case-insensitive (column collation).
pub fn find_person_by_email(conn: &Connection, email: &str) -> Result<Option<Person>, DatabaseError> {
    let person = conn
        .query_row(
            "SELECT id, email, display_name, clinic_id FROM people WHERE email = ?1",
            params![email],
            person_from_row,
        )
        .optional()?;
    Ok(person)
}

/// Doctor roster of a clinic.
pub fn list_people_in_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Person>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, email, display_name, clinic_id FROM people
         WHERE clinic_id = ?1 ORDER BY email",
    )?;
    let rows = stmt
        .query_map(params![clinic_id.to_string()], person_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Pin a person to a clinic only if they are not pinned anywhere yet.
///
/// Returns false when the person already had a clinic (or does not exist):
/// the `clinic_id IS NULL` guard makes concurrent assignments race-free.
pub fn assign_person_clinic(conn: &Connection, person_id: &Uuid, clinic_id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE people SET clinic_id = ?1 WHERE id = ?2 AND clinic_id IS NULL",
        params![clinic_id.to_string(), person_id.to_string()],
    )?;
    Ok(updated == 1)
}

/// Returns false when the person had no clinic.
pub fn clear_person_clinic(conn: &Connection, person_id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE people SET clinic_id = NULL WHERE id = ?1 AND clinic_id IS NOT NULL",
        params![person_id.to_string()],
    )?;
    Ok(updated == 1)
}

/// Unpin every doctor from a clinic, returning how many were detached.
pub fn detach_clinic_roster(conn: &Connection, clinic_id: &Uuid) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE people SET clinic_id = NULL WHERE clinic_id = ?1",
        params![clinic_id.to_string()],
    )?;
    Ok(updated)
}
