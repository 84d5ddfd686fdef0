//! Role ledger: person → role mapping, independent of clinic membership.

use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::person::person_from_row;
use crate::db::DatabaseError;
use crate::models::enums::RoleKind;
use crate::models::Person;

/// Returns true if the role was newly granted, false if already held.
pub fn grant_role(conn: &Connection, person_id: &Uuid, role: RoleKind) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO person_roles (person_id, role) VALUES (?1, ?2)",
        params![person_id.to_string(), role.as_str()],
    )?;
    Ok(inserted > 0)
}

/// Returns true if the role was held and is now removed.
pub fn revoke_role(conn: &Connection, person_id: &Uuid, role: RoleKind) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM person_roles WHERE person_id = ?1 AND role = ?2",
        params![person_id.to_string(), role.as_str()],
    )?;
    Ok(deleted > 0)
}

pub fn has_role(conn: &Connection, person_id: &Uuid, role: RoleKind) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM person_roles WHERE person_id = ?1 AND role = ?2",
        params![person_id.to_string(), role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn roles_for_person(conn: &Connection, person_id: &Uuid) -> Result<Vec<RoleKind>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT role FROM person_roles WHERE person_id = ?1 ORDER BY role",
    )?;
    let raw = stmt
        .query_map(params![person_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    raw.iter().map(|s| RoleKind::from_str(s)).collect()
}

pub fn list_people_with_role(conn: &Connection, role: RoleKind) -> Result<Vec<Person>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.email, p.display_name, p.clinic_id
         FROM people p
         JOIN person_roles r ON r.person_id = p.id
         WHERE r.role = ?1
         ORDER BY p.email",
    )?;
    let rows = stmt
        .query_map(params![role.as_str()], person_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
