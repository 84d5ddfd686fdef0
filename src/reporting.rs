//! Reporting engine: read-only statistics across the registry.
//!
//! Each report reads inside one transaction so it sees a single consistent
//! state. Nothing here repairs data: a join that hits a missing row reports
//! `DataIntegrity` instead of skipping it.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository as repo;
use crate::error::{in_transaction, ClinicError};
use crate::hierarchy::get_clinic;
use crate::membership::get_person;
use crate::models::{Clinic, Diagnostic, Hospital, Person};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HospitalClinics {
    pub hospital: Hospital,
    pub clinics: Vec<Clinic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicOverview {
    pub clinic: Clinic,
    pub doctors: Vec<Person>,
}

/// Diagnostics sharing one author. `creator` is `None` for diagnostics
/// recorded without an author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorDiagnostics {
    pub creator: Option<Person>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticHistoryEntry {
    pub diagnostic: Diagnostic,
    pub clinic_name: String,
    pub assigned_at: NaiveDateTime,
}

fn referenced_person(conn: &Connection, id: &Uuid, referrer: &str) -> Result<Person, ClinicError> {
    repo::get_person(conn, id)?
        .ok_or_else(|| ClinicError::DataIntegrity(format!("{referrer} references missing person {id}")))
}

/// Every hospital (by name) with its clinics (by name).
pub fn clinics_by_hospital(conn: &Connection) -> Result<Vec<HospitalClinics>, ClinicError> {
    in_transaction(conn, |tx| {
        repo::list_hospitals(tx)?
            .into_iter()
            .map(|hospital| -> Result<HospitalClinics, ClinicError> {
                let clinics = repo::list_clinics_for_hospital(tx, &hospital.id)?;
                Ok(HospitalClinics { hospital, clinics })
            })
            .collect()
    })
}

/// Clinics of one hospital with their doctor rosters.
pub fn clinic_overview(conn: &Connection, hospital_id: &Uuid) -> Result<Vec<ClinicOverview>, ClinicError> {
    in_transaction(conn, |tx| {
        repo::get_hospital(tx, hospital_id)?
            .ok_or_else(|| ClinicError::not_found("Hospital", hospital_id))?;
        repo::list_clinics_for_hospital(tx, hospital_id)?
            .into_iter()
            .map(|clinic| -> Result<ClinicOverview, ClinicError> {
                let doctors = repo::list_people_in_clinic(tx, &clinic.id)?;
                Ok(ClinicOverview { clinic, doctors })
            })
            .collect()
    })
}

pub fn doctors_in_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Person>, ClinicError> {
    in_transaction(conn, |tx| {
        get_clinic(tx, clinic_id)?;
        Ok(repo::list_people_in_clinic(tx, clinic_id)?)
    })
}

/// Patients enrolled at a clinic, in enrollment order.
pub fn patients_in_clinic(conn: &Connection, clinic_id: &Uuid) -> Result<Vec<Person>, ClinicError> {
    in_transaction(conn, |tx| {
        get_clinic(tx, clinic_id)?;
        repo::list_patient_clinics_for_clinic(tx, clinic_id)?
            .iter()
            .map(|m| referenced_person(tx, &m.patient_id, "enrollment"))
            .collect()
    })
}

/// Clinics a patient is enrolled at, in enrollment order.
pub fn clinics_for_patient(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Clinic>, ClinicError> {
    in_transaction(conn, |tx| {
        get_person(tx, patient_id)?;
        repo::list_patient_clinics_for_patient(tx, patient_id)?
            .iter()
            .map(|m| -> Result<Clinic, ClinicError> {
                repo::get_clinic(tx, &m.clinic_id)?.ok_or_else(|| {
                    ClinicError::DataIntegrity(format!("enrollment references missing clinic {}", m.clinic_id))
                })
            })
            .collect()
    })
}

/// All diagnostics grouped by author. Groups follow creator id order with
/// the unattributed group first; no diagnostic is left out.
pub fn diagnostics_by_creator(conn: &Connection) -> Result<Vec<CreatorDiagnostics>, ClinicError> {
    in_transaction(conn, |tx| {
        let mut groups: Vec<(Option<Uuid>, Vec<Diagnostic>)> = Vec::new();
        for diagnostic in repo::list_diagnostics_by_creator(tx)? {
            match groups.last_mut() {
                Some((creator, list)) if *creator == diagnostic.creator_id => list.push(diagnostic),
                _ => groups.push((diagnostic.creator_id, vec![diagnostic])),
            }
        }

        groups
            .into_iter()
            .map(|(creator_id, diagnostics)| -> Result<CreatorDiagnostics, ClinicError> {
                let creator = match creator_id {
                    Some(id) => Some(referenced_person(tx, &id, "diagnostic creator")?),
                    None => None,
                };
                Ok(CreatorDiagnostics { creator, diagnostics })
            })
            .collect()
    })
}

pub fn diagnostics_from_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<CreatorDiagnostics, ClinicError> {
    in_transaction(conn, |tx| {
        let creator = get_person(tx, doctor_id)?;
        let diagnostics = repo::list_diagnostics_created_by(tx, doctor_id)?;
        Ok(CreatorDiagnostics {
            creator: Some(creator),
            diagnostics,
        })
    })
}

/// Every diagnostic recorded for a patient, across clinics, in the order
/// they were recorded.
pub fn diagnostic_history(conn: &Connection, patient_id: &Uuid) -> Result<Vec<DiagnosticHistoryEntry>, ClinicError> {
    in_transaction(conn, |tx| {
        get_person(tx, patient_id)?;
        repo::list_patient_diagnostics_for_patient(tx, patient_id)?
            .into_iter()
            .map(|record| -> Result<DiagnosticHistoryEntry, ClinicError> {
                let diagnostic = repo::get_diagnostic(tx, &record.diagnostic_id)?.ok_or_else(|| {
                    ClinicError::DataIntegrity(format!(
                        "patient record references missing diagnostic {}",
                        record.diagnostic_id
                    ))
                })?;
                let clinic = repo::get_clinic(tx, &diagnostic.clinic_id)?.ok_or_else(|| {
                    ClinicError::DataIntegrity(format!(
                        "diagnostic {} references missing clinic {}",
                        diagnostic.id, diagnostic.clinic_id
                    ))
                })?;
                Ok(DiagnosticHistoryEntry {
                    diagnostic,
                    clinic_name: clinic.name,
                    assigned_at: record.assigned_at,
                })
            })
            .collect()
    })
}

/// Patients with at least one diagnostic, each listed once.
pub fn patients_with_diagnostics(conn: &Connection) -> Result<Vec<Person>, ClinicError> {
    in_transaction(conn, |tx| {
        repo::list_patient_ids_with_diagnostics(tx)?
            .iter()
            .map(|id| referenced_person(tx, id, "patient record"))
            .collect()
    })
}
