//! Membership engine: doctor ↔ clinic assignment and patient ↔ clinic enrollment.
//!
//! Keeps two derived facts consistent with the membership rows:
//! - a doctor is on a clinic roster exactly when `people.clinic_id` points at it,
//!   and never on more than one;
//! - a person holds the Patient role exactly when they have at least one
//!   enrollment.

use serde::Serialize;
use uuid::Uuid;
use rusqlite::Connection;

use crate::db::repository::{self as repo, now_timestamp};
use crate::error::{in_transaction, require_text, ClinicError};
use crate::hierarchy::get_clinic;
use crate::models::enums::RoleKind;
use crate::models::{Clinic, PatientClinic, Person};

/// What a patient un-enrollment cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRemoval {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub diagnostics_removed: usize,
    pub patient_role_revoked: bool,
}

// ═══════════════════════════════════════════
// Identity boundary
// ═══════════════════════════════════════════

/// Create a person record. In production this is the identity subsystem's
/// job; the registry only needs the row to exist.
pub fn register_person(conn: &Connection, email: &str, display_name: &str) -> Result<Person, ClinicError> {
    let email = require_text("email", email)?;
    let display_name = match display_name.trim() {
        "" => email,
        name => name,
    };
    let person = Person {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: display_name.to_string(),
        clinic_id: None,
    };
    in_transaction(conn, |tx| {
        if repo::find_person_by_email(tx, email)?.is_some() {
            return Err(ClinicError::Conflict(format!("a person with email {email} already exists")));
        }
        repo::insert_person(tx, &person)?;
        Ok(())
    })?;
    tracing::info!(person_id = %person.id, "Person registered");
    Ok(person)
}

fn person_by_email(conn: &Connection, email: &str) -> Result<Person, ClinicError> {
    let email = require_text("email", email)?;
    repo::find_person_by_email(conn, email)?
        .ok_or_else(|| ClinicError::not_found("Person", email))
}

pub fn get_person(conn: &Connection, id: &Uuid) -> Result<Person, ClinicError> {
    repo::get_person(conn, id)?.ok_or_else(|| ClinicError::not_found("Person", id))
}

// ═══════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════

pub fn assign_doctor_role(conn: &Connection, email: &str) -> Result<Person, ClinicError> {
    let person = in_transaction(conn, |tx| {
        let person = person_by_email(tx, email)?;
        if !repo::grant_role(tx, &person.id, RoleKind::Doctor)? {
            return Err(ClinicError::Conflict(format!("{} already holds the Doctor role", person.email)));
        }
        Ok(person)
    })?;
    tracing::info!(person_id = %person.id, "Doctor role granted");
    Ok(person)
}

/// Detach the doctor from their clinic (if any), then drop the Doctor role.
pub fn revoke_doctor_role(conn: &Connection, person_id: &Uuid) -> Result<(), ClinicError> {
    in_transaction(conn, |tx| {
        let person = get_person(tx, person_id)?;
        if !repo::has_role(tx, person_id, RoleKind::Doctor)? {
            return Err(ClinicError::InvalidState(format!("{} does not hold the Doctor role", person.email)));
        }
        if person.clinic_id.is_some() {
            detach_doctor(tx, person_id)?;
        }
        repo::revoke_role(tx, person_id, RoleKind::Doctor)?;
        Ok(())
    })?;
    tracing::info!(person_id = %person_id, "Doctor role revoked");
    Ok(())
}

pub fn add_doctor_to_clinic(conn: &Connection, email: &str, clinic_id: &Uuid) -> Result<Person, ClinicError> {
    let person = in_transaction(conn, |tx| {
        let mut person = person_by_email(tx, email)?;
        let clinic = get_clinic(tx, clinic_id)?;
        if !repo::has_role(tx, &person.id, RoleKind::Doctor)? {
            return Err(ClinicError::InvalidState(format!("{} is not a doctor", person.email)));
        }
        if person.clinic_id.is_some() {
            return Err(ClinicError::Conflict(format!("{} already works at another clinic", person.email)));
        }
        // The store-level guard decides when two assignments race.
        if !repo::assign_person_clinic(tx, &person.id, &clinic.id)? {
            return Err(ClinicError::Conflict(format!("{} was assigned to a clinic concurrently", person.email)));
        }
        person.clinic_id = Some(clinic.id);
        Ok(person)
    })?;
    tracing::info!(person_id = %person.id, clinic_id = %clinic_id, "Doctor added to clinic");
    Ok(person)
}

pub fn remove_doctor_from_clinic(conn: &Connection, person_id: &Uuid) -> Result<(), ClinicError> {
    let clinic_id = in_transaction(conn, |tx| detach_doctor(tx, person_id))?;
    tracing::info!(person_id = %person_id, clinic_id = %clinic_id, "Doctor removed from clinic");
    Ok(())
}

/// Clear a doctor's clinic inside the caller's transaction. The Doctor role
/// is left alone. Returns the clinic the doctor left.
pub(crate) fn detach_doctor(conn: &Connection, person_id: &Uuid) -> Result<Uuid, ClinicError> {
    let person = get_person(conn, person_id)?;
    let clinic_id = person
        .clinic_id
        .ok_or_else(|| ClinicError::InvalidState(format!("{} is not assigned to a clinic", person.email)))?;
    get_clinic(conn, &clinic_id)?;
    if !repo::clear_person_clinic(conn, person_id)? {
        return Err(ClinicError::Conflict(format!("{} was detached concurrently", person.email)));
    }
    Ok(clinic_id)
}

/// The clinic a doctor currently works at, if any.
pub fn doctor_clinic(conn: &Connection, person_id: &Uuid) -> Result<Option<Clinic>, ClinicError> {
    let person = get_person(conn, person_id)?;
    match person.clinic_id {
        Some(clinic_id) => repo::get_clinic(conn, &clinic_id)?
            .map(Some)
            .ok_or_else(|| {
                ClinicError::DataIntegrity(format!("person {person_id} points at missing clinic {clinic_id}"))
            }),
        None => Ok(None),
    }
}

/// Everyone holding the Doctor role, assigned or not.
pub fn list_doctors(conn: &Connection) -> Result<Vec<Person>, ClinicError> {
    Ok(repo::list_people_with_role(conn, RoleKind::Doctor)?)
}

// ═══════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════

/// Enroll a person at a clinic, granting the Patient role on first enrollment.
pub fn add_patient_to_clinic(conn: &Connection, email: &str, clinic_id: &Uuid) -> Result<PatientClinic, ClinicError> {
    let (membership, role_granted) = in_transaction(conn, |tx| {
        let person = person_by_email(tx, email)?;
        let clinic = get_clinic(tx, clinic_id)?;
        if repo::get_patient_clinic(tx, &person.id, &clinic.id)?.is_some() {
            return Err(ClinicError::Conflict(format!(
                "{} is already enrolled at {}",
                person.email, clinic.name
            )));
        }
        let role_granted = repo::grant_role(tx, &person.id, RoleKind::Patient)?;
        let membership = PatientClinic {
            patient_id: person.id,
            clinic_id: clinic.id,
            enrolled_at: now_timestamp(),
        };
        repo::insert_patient_clinic(tx, &membership)?;
        Ok((membership, role_granted))
    })?;
    tracing::info!(
        patient_id = %membership.patient_id,
        clinic_id = %membership.clinic_id,
        role_granted,
        "Patient enrolled in clinic"
    );
    Ok(membership)
}

pub fn remove_patient_from_clinic(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<PatientRemoval, ClinicError> {
    let removal = in_transaction(conn, |tx| detach_patient(tx, patient_id, clinic_id))?;
    tracing::info!(
        patient_id = %patient_id,
        clinic_id = %clinic_id,
        diagnostics_removed = removal.diagnostics_removed,
        patient_role_revoked = removal.patient_role_revoked,
        "Patient removed from clinic"
    );
    Ok(removal)
}

/// Un-enroll inside the caller's transaction: drop the patient's diagnostics
/// owned by this clinic, then the membership, then the Patient role if this
/// was the last enrollment.
pub(crate) fn detach_patient(
    conn: &Connection,
    patient_id: &Uuid,
    clinic_id: &Uuid,
) -> Result<PatientRemoval, ClinicError> {
    if repo::get_patient_clinic(conn, patient_id, clinic_id)?.is_none() {
        return Err(ClinicError::not_found("PatientClinic", format!("{patient_id}/{clinic_id}")));
    }

    let diagnostics_removed = repo::delete_patient_diagnostics_in_clinic(conn, patient_id, clinic_id)?;
    repo::delete_patient_clinic(conn, patient_id, clinic_id)?;

    let mut patient_role_revoked = false;
    if repo::count_patient_clinics(conn, patient_id)? == 0 {
        patient_role_revoked = repo::revoke_role(conn, patient_id, RoleKind::Patient)?;
        if !patient_role_revoked {
            tracing::warn!(patient_id = %patient_id, "Patient role already absent after last un-enrollment");
        }
    }

    tracing::debug!(
        patient_id = %patient_id,
        clinic_id = %clinic_id,
        diagnostics_removed,
        "Patient membership detached"
    );

    Ok(PatientRemoval {
        patient_id: *patient_id,
        clinic_id: *clinic_id,
        diagnostics_removed,
        patient_role_revoked,
    })
}
