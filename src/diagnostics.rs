//! Diagnostic engine: clinic-scoped diagnostic definitions and the patient
//! records that reference them.
//!
//! A patient record may only exist while the patient is enrolled at the
//! diagnostic's clinic; assignment checks this up front and un-enrollment
//! (see `membership`) strips the records again.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::{self as repo, now_timestamp};
use crate::error::{in_transaction, require_text, ClinicError};
use crate::hierarchy::get_clinic;
use crate::membership::get_person;
use crate::models::{Diagnostic, PatientDiagnostic};

/// A patient's diagnostic at one clinic, with its author for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientDiagnosticView {
    pub diagnostic: Diagnostic,
    pub creator_email: Option<String>,
    pub assigned_at: NaiveDateTime,
}

fn diagnostic_by_id(conn: &Connection, id: &Uuid) -> Result<Diagnostic, ClinicError> {
    repo::get_diagnostic(conn, id)?.ok_or_else(|| ClinicError::not_found("Diagnostic", id))
}

// ═══════════════════════════════════════════
// Definitions
// ═══════════════════════════════════════════

/// Publish a diagnostic at a clinic. `creator_id` is recorded as given.
pub fn add_diagnostic(
    conn: &Connection,
    clinic_id: &Uuid,
    name: &str,
    description: &str,
    creator_id: Option<Uuid>,
) -> Result<Diagnostic, ClinicError> {
    let name = require_text("diagnostic name", name)?;
    let diagnostic = Diagnostic {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.trim().to_string(),
        clinic_id: *clinic_id,
        creator_id,
    };
    in_transaction(conn, |tx| {
        get_clinic(tx, clinic_id)?;
        repo::insert_diagnostic(tx, &diagnostic)?;
        Ok(())
    })?;
    tracing::info!(diagnostic_id = %diagnostic.id, clinic_id = %clinic_id, "Diagnostic added");
    Ok(diagnostic)
}

pub fn get_diagnostic(conn: &Connection, id: &Uuid) -> Result<Diagnostic, ClinicError> {
    diagnostic_by_id(conn, id)
}

/// Update name and description. The owning clinic cannot change.
pub fn edit_diagnostic(
    conn: &Connection,
    id: &Uuid,
    name: &str,
    description: &str,
) -> Result<Diagnostic, ClinicError> {
    let name = require_text("diagnostic name", name)?;
    let diagnostic = in_transaction(conn, |tx| {
        if !repo::update_diagnostic(tx, id, name, description.trim())? {
            return Err(ClinicError::not_found("Diagnostic", id));
        }
        diagnostic_by_id(tx, id)
    })?;
    tracing::info!(diagnostic_id = %id, "Diagnostic edited");
    Ok(diagnostic)
}

/// Delete a diagnostic and every patient record of it. Returns how many
/// patient records went with it.
pub fn remove_diagnostic(conn: &Connection, id: &Uuid) -> Result<usize, ClinicError> {
    let records_removed = in_transaction(conn, |tx| {
        diagnostic_by_id(tx, id)?;
        let records = repo::delete_patient_diagnostics_for_diagnostic(tx, id)?;
        repo::delete_diagnostic(tx, id)?;
        Ok(records)
    })?;
    tracing::info!(diagnostic_id = %id, records_removed, "Diagnostic removed");
    Ok(records_removed)
}

pub fn diagnostics_in_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Diagnostic>, ClinicError> {
    get_clinic(conn, clinic_id)?;
    Ok(repo::list_diagnostics_for_clinic(conn, clinic_id)?)
}

// ═══════════════════════════════════════════
// Patient records
// ═══════════════════════════════════════════

pub fn assign_diagnostic_to_patient(
    conn: &Connection,
    diagnostic_id: &Uuid,
    patient_id: &Uuid,
) -> Result<PatientDiagnostic, ClinicError> {
    let record = in_transaction(conn, |tx| {
        let diagnostic = diagnostic_by_id(tx, diagnostic_id)?;
        get_person(tx, patient_id)?;
        if repo::get_patient_clinic(tx, patient_id, &diagnostic.clinic_id)?.is_none() {
            return Err(ClinicError::InvalidState(format!(
                "patient {patient_id} is not enrolled at the clinic owning diagnostic {diagnostic_id}"
            )));
        }
        if repo::get_patient_diagnostic(tx, patient_id, diagnostic_id)?.is_some() {
            return Err(ClinicError::Conflict(format!(
                "patient {patient_id} already has diagnostic {diagnostic_id}"
            )));
        }
        let record = PatientDiagnostic {
            patient_id: *patient_id,
            diagnostic_id: *diagnostic_id,
            assigned_at: now_timestamp(),
        };
        repo::insert_patient_diagnostic(tx, &record)?;
        Ok(record)
    })?;
    tracing::info!(diagnostic_id = %diagnostic_id, patient_id = %patient_id, "Diagnostic assigned to patient");
    Ok(record)
}

pub fn remove_diagnostic_from_patient(
    conn: &Connection,
    diagnostic_id: &Uuid,
    patient_id: &Uuid,
) -> Result<(), ClinicError> {
    in_transaction(conn, |tx| {
        if !repo::delete_patient_diagnostic(tx, patient_id, diagnostic_id)? {
            return Err(ClinicError::not_found(
                "PatientDiagnostic",
                format!("{patient_id}/{diagnostic_id}"),
            ));
        }
        Ok(())
    })?;
    tracing::info!(diagnostic_id = %diagnostic_id, patient_id = %patient_id, "Diagnostic removed from patient");
    Ok(())
}

/// Diagnostics of `clinic_id` the patient does not have yet, for assignment
/// pickers. The set is read once; iteration order is stable for the result.
pub fn list_available_diagnostics(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<impl ExactSizeIterator<Item = Diagnostic>, ClinicError> {
    let available = in_transaction(conn, |tx| {
        get_person(tx, patient_id)?;
        get_clinic(tx, clinic_id)?;
        Ok(repo::list_available_diagnostics(tx, patient_id, clinic_id)?)
    })?;
    Ok(available.into_iter())
}

/// The patient's diagnostics at one clinic, each with its author's email when
/// the author is still known.
pub fn patient_diagnostics_in_clinic(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<Vec<PatientDiagnosticView>, ClinicError> {
    in_transaction(conn, |tx| {
        get_person(tx, patient_id)?;
        get_clinic(tx, clinic_id)?;
        let mut views = Vec::new();
        for diagnostic in repo::list_assigned_diagnostics(tx, patient_id, clinic_id)? {
            let record = repo::get_patient_diagnostic(tx, patient_id, &diagnostic.id)?
                .ok_or_else(|| {
                    ClinicError::DataIntegrity(format!(
                        "record for diagnostic {} vanished mid-read",
                        diagnostic.id
                    ))
                })?;
            let creator_email = match diagnostic.creator_id {
                Some(creator_id) => repo::get_person(tx, &creator_id)?.map(|p| p.email),
                None => None,
            };
            views.push(PatientDiagnosticView {
                diagnostic,
                creator_email,
                assigned_at: record.assigned_at,
            });
        }
        Ok(views)
    })
}
