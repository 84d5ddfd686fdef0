//! Join rows: patient ↔ clinic enrollment and patient ↔ diagnostic records.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, timestamp_column, uuid_column};
use crate::db::DatabaseError;
use crate::models::{PatientClinic, PatientDiagnostic};

// ═══════════════════════════════════════════
// Patient ↔ Clinic
// ═══════════════════════════════════════════

fn patient_clinic_from_row(row: &Row<'_>) -> rusqlite::Result<PatientClinic> {
    Ok(PatientClinic {
        patient_id: uuid_column(row, 0)?,
        clinic_id: uuid_column(row, 1)?,
        enrolled_at: timestamp_column(row, 2)?,
    })
}

pub fn insert_patient_clinic(conn: &Connection, membership: &PatientClinic) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_clinics (patient_id, clinic_id, enrolled_at) VALUES (?1, ?2, ?3)",
        params![
            membership.patient_id.to_string(),
            membership.clinic_id.to_string(),
            format_timestamp(&membership.enrolled_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient_clinic(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<Option<PatientClinic>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT patient_id, clinic_id, enrolled_at FROM patient_clinics
             WHERE patient_id = ?1 AND clinic_id = ?2",
            params![patient_id.to_string(), clinic_id.to_string()],
            patient_clinic_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn delete_patient_clinic(conn: &Connection, patient_id: &Uuid, clinic_id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patient_clinics WHERE patient_id = ?1 AND clinic_id = ?2",
        params![patient_id.to_string(), clinic_id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn count_patient_clinics(conn: &Connection, patient_id: &Uuid) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patient_clinics WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_patient_clinics_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<PatientClinic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, clinic_id, enrolled_at FROM patient_clinics
         WHERE clinic_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(params![clinic_id.to_string()], patient_clinic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_patient_clinics_for_patient(conn: &Connection, patient_id: &Uuid) -> Result<Vec<PatientClinic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, clinic_id, enrolled_at FROM patient_clinics
         WHERE patient_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], patient_clinic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ═══════════════════════════════════════════
// Patient ↔ Diagnostic
// ═══════════════════════════════════════════

fn patient_diagnostic_from_row(row: &Row<'_>) -> rusqlite::Result<PatientDiagnostic> {
    Ok(PatientDiagnostic {
        patient_id: uuid_column(row, 0)?,
        diagnostic_id: uuid_column(row, 1)?,
        assigned_at: timestamp_column(row, 2)?,
    })
}

pub fn insert_patient_diagnostic(conn: &Connection, record: &PatientDiagnostic) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_diagnostics (patient_id, diagnostic_id, assigned_at) VALUES (?1, ?2, ?3)",
        params![
            record.patient_id.to_string(),
            record.diagnostic_id.to_string(),
            format_timestamp(&record.assigned_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient_diagnostic(
    conn: &Connection,
    patient_id: &Uuid,
    diagnostic_id: &Uuid,
) -> Result<Option<PatientDiagnostic>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT patient_id, diagnostic_id, assigned_at FROM patient_diagnostics
             WHERE patient_id = ?1 AND diagnostic_id = ?2",
            params![patient_id.to_string(), diagnostic_id.to_string()],
            patient_diagnostic_from_row,
        )
        .optional()?;
    Ok(row)
}

pub fn delete_patient_diagnostic(conn: &Connection, patient_id: &Uuid, diagnostic_id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patient_diagnostics WHERE patient_id = ?1 AND diagnostic_id = ?2",
        params![patient_id.to_string(), diagnostic_id.to_string()],
    )?;
    Ok(deleted > 0)
}

/// Remove a patient's records for every diagnostic owned by `clinic_id`.
pub fn delete_patient_diagnostics_in_clinic(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patient_diagnostics
         WHERE patient_id = ?1
           AND diagnostic_id IN (SELECT id FROM diagnostics WHERE clinic_id = ?2)",
        params![patient_id.to_string(), clinic_id.to_string()],
    )?;
    Ok(deleted)
}

pub fn delete_patient_diagnostics_for_diagnostic(conn: &Connection, diagnostic_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patient_diagnostics WHERE diagnostic_id = ?1",
        params![diagnostic_id.to_string()],
    )?;
    Ok(deleted)
}

/// Remove every patient record pointing at any diagnostic of `clinic_id`.
pub fn delete_patient_diagnostics_for_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patient_diagnostics
         WHERE diagnostic_id IN (SELECT id FROM diagnostics WHERE clinic_id = ?1)",
        params![clinic_id.to_string()],
    )?;
    Ok(deleted)
}

pub fn list_patient_diagnostics_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientDiagnostic>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, diagnostic_id, assigned_at FROM patient_diagnostics
         WHERE patient_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], patient_diagnostic_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct patients holding at least one diagnostic record.
pub fn list_patient_ids_with_diagnostics(conn: &Connection) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT patient_id FROM patient_diagnostics ORDER BY patient_id",
    )?;
    let rows = stmt
        .query_map([], |row| uuid_column(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
