//! Hierarchy manager: hospitals, their clinics, and clinic services.
//!
//! A clinic belongs to exactly one hospital through `clinics.hospital_id`;
//! a hospital's clinic set is the query over that column. Removing a clinic
//! runs the full cascade (patients, doctors, diagnostics, services) in the
//! caller's transaction, so removing a hospital is all-or-nothing.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository as repo;
use crate::error::{in_transaction, require_text, ClinicError};
use crate::membership;
use crate::models::{Clinic, Hospital, Service};

/// Rows removed by a clinic cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClinicRemoval {
    pub clinic_id: Uuid,
    pub patients_removed: usize,
    pub patient_roles_revoked: usize,
    pub doctors_detached: usize,
    pub diagnostics_removed: usize,
    pub patient_diagnostics_removed: usize,
    pub services_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HospitalRemoval {
    pub hospital_id: Uuid,
    pub clinics: Vec<ClinicRemoval>,
}

// ═══════════════════════════════════════════
// Hospitals
// ═══════════════════════════════════════════

pub fn add_hospital(conn: &Connection, name: &str) -> Result<Hospital, ClinicError> {
    let name = require_text("hospital name", name)?;
    let hospital = Hospital {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    in_transaction(conn, |tx| {
        if repo::find_hospital_by_name(tx, name)?.is_some() {
            return Err(ClinicError::Conflict(format!("a hospital named {name} already exists")));
        }
        repo::insert_hospital(tx, &hospital)?;
        Ok(())
    })?;
    tracing::info!(hospital_id = %hospital.id, "Hospital added");
    Ok(hospital)
}

pub fn get_hospital(conn: &Connection, id: &Uuid) -> Result<Hospital, ClinicError> {
    repo::get_hospital(conn, id)?.ok_or_else(|| ClinicError::not_found("Hospital", id))
}

/// Rename a hospital. Taking a name another hospital already uses is a `Conflict`.
pub fn edit_hospital(conn: &Connection, id: &Uuid, new_name: &str) -> Result<Hospital, ClinicError> {
    let new_name = require_text("hospital name", new_name)?;
    let hospital = in_transaction(conn, |tx| {
        if !repo::rename_hospital(tx, id, new_name)? {
            return Err(ClinicError::not_found("Hospital", id));
        }
        get_hospital(tx, id)
    })?;
    tracing::info!(hospital_id = %id, "Hospital renamed");
    Ok(hospital)
}

/// Remove a hospital and cascade-remove every clinic it owns.
pub fn remove_hospital(conn: &Connection, id: &Uuid) -> Result<HospitalRemoval, ClinicError> {
    let removal = in_transaction(conn, |tx| {
        get_hospital(tx, id)?;
        let clinics = repo::list_clinics_for_hospital(tx, id)?
            .iter()
            .map(|clinic| remove_clinic_in(tx, &clinic.id))
            .collect::<Result<Vec<_>, _>>()?;
        repo::delete_hospital(tx, id)?;
        Ok(HospitalRemoval {
            hospital_id: *id,
            clinics,
        })
    })?;
    tracing::info!(
        hospital_id = %id,
        clinics = removal.clinics.len(),
        "Hospital cascade-removed with all clinics"
    );
    Ok(removal)
}

// ═══════════════════════════════════════════
// Clinics
// ═══════════════════════════════════════════

pub fn add_clinic(conn: &Connection, hospital_id: &Uuid, name: &str) -> Result<Clinic, ClinicError> {
    let name = require_text("clinic name", name)?;
    let clinic = Clinic {
        id: Uuid::new_v4(),
        name: name.to_string(),
        hospital_id: Some(*hospital_id),
    };
    in_transaction(conn, |tx| {
        get_hospital(tx, hospital_id)?;
        if repo::find_clinic_by_name(tx, name)?.is_some() {
            return Err(ClinicError::Conflict(format!("a clinic named {name} already exists")));
        }
        repo::insert_clinic(tx, &clinic)?;
        Ok(())
    })?;
    tracing::info!(clinic_id = %clinic.id, hospital_id = %hospital_id, "Clinic added");
    Ok(clinic)
}

pub fn get_clinic(conn: &Connection, id: &Uuid) -> Result<Clinic, ClinicError> {
    repo::get_clinic(conn, id)?.ok_or_else(|| ClinicError::not_found("Clinic", id))
}

/// Rename a clinic; its hospital link is untouched.
pub fn edit_clinic(conn: &Connection, id: &Uuid, new_name: &str) -> Result<Clinic, ClinicError> {
    let new_name = require_text("clinic name", new_name)?;
    let clinic = in_transaction(conn, |tx| {
        if !repo::rename_clinic(tx, id, new_name)? {
            return Err(ClinicError::not_found("Clinic", id));
        }
        get_clinic(tx, id)
    })?;
    tracing::info!(clinic_id = %id, "Clinic renamed");
    Ok(clinic)
}

pub fn remove_clinic(conn: &Connection, id: &Uuid) -> Result<ClinicRemoval, ClinicError> {
    let removal = in_transaction(conn, |tx| remove_clinic_in(tx, id))?;
    tracing::info!(
        clinic_id = %id,
        patients = removal.patients_removed,
        doctors = removal.doctors_detached,
        diagnostics = removal.diagnostics_removed,
        services = removal.services_removed,
        "Clinic cascade-removed"
    );
    Ok(removal)
}

/// Clinic cascade inside the caller's transaction. Order matters: patient
/// memberships go first so their diagnostics and roles are reconciled while
/// the clinic's diagnostics still exist.
fn remove_clinic_in(conn: &Connection, id: &Uuid) -> Result<ClinicRemoval, ClinicError> {
    get_clinic(conn, id)?;
    let mut removal = ClinicRemoval {
        clinic_id: *id,
        ..ClinicRemoval::default()
    };

    for membership in repo::list_patient_clinics_for_clinic(conn, id)? {
        let patient = membership::detach_patient(conn, &membership.patient_id, id)?;
        removal.patients_removed += 1;
        removal.patient_diagnostics_removed += patient.diagnostics_removed;
        if patient.patient_role_revoked {
            removal.patient_roles_revoked += 1;
        }
    }

    removal.doctors_detached = repo::detach_clinic_roster(conn, id)?;

    removal.patient_diagnostics_removed += repo::delete_patient_diagnostics_for_clinic(conn, id)?;
    removal.diagnostics_removed = repo::delete_diagnostics_for_clinic(conn, id)?;

    removal.services_removed = repo::delete_services_for_clinic(conn, id)?;

    repo::delete_clinic(conn, id)?;

    tracing::debug!(clinic_id = %id, ?removal, "Clinic cascade step complete");
    Ok(removal)
}

// ═══════════════════════════════════════════
// Services
// ═══════════════════════════════════════════

pub fn add_service(conn: &Connection, clinic_id: &Uuid, name: &str) -> Result<Service, ClinicError> {
    let name = require_text("service name", name)?;
    let service = Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        clinic_id: *clinic_id,
    };
    in_transaction(conn, |tx| {
        get_clinic(tx, clinic_id)?;
        repo::insert_service(tx, &service)?;
        Ok(())
    })?;
    tracing::info!(service_id = %service.id, clinic_id = %clinic_id, "Service added");
    Ok(service)
}

pub fn remove_service(conn: &Connection, id: &Uuid) -> Result<(), ClinicError> {
    in_transaction(conn, |tx| Ok(repo::delete_service(tx, id)?))?;
    tracing::info!(service_id = %id, "Service removed");
    Ok(())
}

pub fn list_services(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Service>, ClinicError> {
    get_clinic(conn, clinic_id)?;
    Ok(repo::list_services_for_clinic(conn, clinic_id)?)
}
